//! Storage layer for the credit ledger.
//!
//! The store is the sole arbiter of every read-then-write on a balance: each
//! mutating operation of [`Store`] runs as one atomic unit that re-reads the
//! balance, decides, writes the new balance and appends the transaction record
//! together. Nothing is locked on the client side, so correctness holds across
//! processes as long as the backend serializes access to the account row.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`; row locks and a unique account key.
//! - [`MemoryStore`]: single-process store for tests and local runs.
//! - `RocksStore` (feature `rocksdb-backend`): `RocksDB` `TransactionDB`.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{AccountId, BalanceChange, TransactionDraft, TransactionKind};
//! use ledger_store::{MemoryStore, Store};
//!
//! # async fn example() -> ledger_store::Result<()> {
//! let store = MemoryStore::new();
//! let account = AccountId::generate();
//!
//! store
//!     .create_account(&account, 50, TransactionDraft::new(TransactionKind::Initialize, "welcome"))
//!     .await?;
//! let record = store
//!     .apply(&account, BalanceChange::Debit(5), TransactionDraft::new(TransactionKind::Consume, "analysis"))
//!     .await?;
//! assert_eq!(record.balance_after, 45);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use ledger_core::{
    AccountBalance, AccountId, BalanceChange, TransactionDraft, TransactionId, TransactionRecord,
};

/// Result of an insert-if-absent account creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Initialized {
    /// The account as it exists after the call.
    pub account: AccountBalance,
    /// The INITIALIZE record, present only when this call created the account.
    pub record: Option<TransactionRecord>,
}

impl Initialized {
    /// Whether this call created the account.
    #[must_use]
    pub const fn created(&self) -> bool {
        self.record.is_some()
    }
}

/// The storage trait defining all ledger persistence operations.
///
/// Implementations must make `create_account` and `apply` all-or-nothing: an
/// error, or a cancelled future, leaves neither a balance change nor a record.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Get an account balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get_account(&self, account_id: &AccountId) -> Result<Option<AccountBalance>>;

    /// List accounts, most recently created first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<AccountBalance>>;

    /// Create the account with `initial_credits` unless it already exists.
    ///
    /// Exactly one concurrent caller creates the account and appends the
    /// INITIALIZE record (balance-before 0); every other caller observes the
    /// existing account unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn create_account(
        &self,
        account_id: &AccountId,
        initial_credits: i64,
        draft: TransactionDraft,
    ) -> Result<Initialized>;

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Atomically apply `change` to the balance and append the record.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientCredits` if a debit exceeds the balance.
    /// - `StoreError::Database` if the unit could not be committed.
    async fn apply(
        &self,
        account_id: &AccountId,
        change: BalanceChange,
        draft: TransactionDraft,
    ) -> Result<TransactionRecord>;

    // =========================================================================
    // Transaction Log
    // =========================================================================

    /// Get a transaction record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<TransactionRecord>>;

    /// List an account's records, newest (highest sequence) first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn list_transactions(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>>;
}
