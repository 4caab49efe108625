//! Core types for the credit ledger.
//!
//! This crate provides the foundational types shared by the store, the service
//! and the client:
//!
//! - **Identifiers**: `AccountId`, `TransactionId`
//! - **Balances**: `AccountBalance` and the default policy constants
//! - **Audit trail**: `TransactionRecord`, `TransactionKind`, `Metadata`
//! - **Catalog**: `CreditPack`
//! - **Errors**: `LedgerError`
//!
//! # Credit unit
//!
//! Credits are whole, non-negative integers stored as `i64`. A new account
//! receives 50 credits; one AI analysis costs 5.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod pack;
pub mod transaction;

pub use account::{AccountBalance, DEFAULT_ANALYSIS_COST, DEFAULT_INITIAL_CREDITS};
pub use error::{LedgerError, Result};
pub use ids::{AccountId, IdError, TransactionId};
pub use metadata::Metadata;
pub use pack::{default_packs, find_pack, CreditPack};
pub use transaction::{
    BalanceChange, ChangeError, TransactionDraft, TransactionKind, TransactionRecord,
};
