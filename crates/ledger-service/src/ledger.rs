//! The Ledger Service: the only write path for balances.
//!
//! Every mutation is delegated to a single atomic [`Store`] operation. The
//! service validates amounts, applies the auto-initialization policy and logs
//! the outcome; it holds no locks of its own.

use std::sync::Arc;

use ledger_core::metadata::keys;
use ledger_core::{
    AccountBalance, AccountId, BalanceChange, CreditPack, LedgerError, Metadata, Result,
    TransactionDraft, TransactionId, TransactionKind, TransactionRecord, DEFAULT_INITIAL_CREDITS,
};
use ledger_store::{Initialized, Store, StoreError};
use serde::Serialize;

/// When an account that has never been seen gets its balance row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPolicy {
    /// Any balance query or mutation initializes the account with `credits`
    /// first.
    OnFirstUse {
        /// Initial grant.
        credits: i64,
    },
    /// Only `initialize` creates accounts. Mutations on unseen accounts fail
    /// with `AccountNotFound` and `balance_of` reports 0 without writing.
    Explicit,
}

impl Default for InitPolicy {
    fn default() -> Self {
        Self::OnFirstUse {
            credits: DEFAULT_INITIAL_CREDITS,
        }
    }
}

/// Result of replaying an account's log against its balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// The audited account.
    pub account_id: AccountId,
    /// Stored balance.
    pub balance: i64,
    /// Sum of all signed amounts, starting from zero.
    pub replayed_balance: i64,
    /// Number of records replayed.
    pub records: usize,
    /// Records whose `balance_after` does not equal `balance_before + amount`.
    pub unbalanced: Vec<TransactionId>,
    /// Whether sequences run 1..=n without gaps and each record starts where
    /// the previous one ended.
    pub chain_intact: bool,
}

impl AuditReport {
    /// Whether the conservation law holds for this account.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.balance == self.replayed_balance && self.unbalanced.is_empty() && self.chain_intact
    }
}

/// The transactional ledger API.
pub struct Ledger {
    store: Arc<dyn Store>,
    policy: InitPolicy,
}

impl Ledger {
    /// Create a ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, policy: InitPolicy) -> Self {
        Self { store, policy }
    }

    /// The configured auto-initialization policy.
    #[must_use]
    pub const fn policy(&self) -> InitPolicy {
        self.policy
    }

    /// Create the account with `initial_credits` unless it already exists.
    ///
    /// Idempotent: an existing account is returned unchanged and nothing is
    /// written. Concurrent callers race on the store's unique account key.
    pub async fn initialize(
        &self,
        account_id: &AccountId,
        initial_credits: i64,
    ) -> Result<Initialized> {
        if initial_credits < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "initial credits must not be negative, got {initial_credits}"
            )));
        }

        let draft = TransactionDraft::new(TransactionKind::Initialize, "Welcome credits")
            .with_metadata(Metadata::new().with(keys::SOURCE, "initialize"));
        let init = self
            .store
            .create_account(account_id, initial_credits, draft)
            .await?;

        if init.created() {
            tracing::info!(
                account_id = %account_id,
                initial_credits,
                "Account initialized"
            );
        } else {
            tracing::debug!(account_id = %account_id, "Account already initialized");
        }
        Ok(init)
    }

    /// Spend `amount` credits.
    ///
    /// Fails with `InsufficientCredits` and writes nothing when the balance is
    /// lower than `amount` at the moment the store applies the debit.
    pub async fn consume(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: &str,
        metadata: Metadata,
    ) -> Result<TransactionRecord> {
        require_positive(amount)?;
        let draft =
            TransactionDraft::new(TransactionKind::Consume, reason).with_metadata(metadata);

        match self
            .mutate(account_id, BalanceChange::Debit(amount), draft)
            .await
        {
            Ok(record) => {
                tracing::info!(
                    account_id = %account_id,
                    amount,
                    balance = record.balance_after,
                    reason,
                    "Credits consumed"
                );
                Ok(record)
            }
            Err(e @ LedgerError::InsufficientCredits { .. }) => {
                tracing::warn!(account_id = %account_id, amount, reason, error = %e, "Consume rejected");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Add `amount` credits (purchase, bonus).
    pub async fn grant(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: &str,
        metadata: Metadata,
    ) -> Result<TransactionRecord> {
        require_positive(amount)?;
        let draft = TransactionDraft::new(TransactionKind::Grant, reason).with_metadata(metadata);
        let record = self
            .mutate(account_id, BalanceChange::Credit(amount), draft)
            .await?;

        tracing::info!(
            account_id = %account_id,
            amount,
            balance = record.balance_after,
            reason,
            "Credits granted"
        );
        Ok(record)
    }

    /// Set the balance to an absolute value. The record's signed amount is
    /// `new_balance - balance_before`.
    pub async fn admin_set(
        &self,
        account_id: &AccountId,
        new_balance: i64,
        reason: &str,
        metadata: Metadata,
    ) -> Result<TransactionRecord> {
        if new_balance < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "balance must not be negative, got {new_balance}"
            )));
        }
        let draft =
            TransactionDraft::new(TransactionKind::AdminSet, reason).with_metadata(metadata);
        let record = self
            .mutate(account_id, BalanceChange::Set(new_balance), draft)
            .await?;

        tracing::info!(
            account_id = %account_id,
            balance_before = record.balance_before,
            balance = record.balance_after,
            amount = record.amount,
            reason,
            "Balance set by admin"
        );
        Ok(record)
    }

    /// Grant tagged as an administrative action.
    pub async fn admin_grant(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: &str,
        metadata: Metadata,
    ) -> Result<TransactionRecord> {
        require_positive(amount)?;
        let draft =
            TransactionDraft::new(TransactionKind::AdminGrant, reason).with_metadata(metadata);
        let record = self
            .mutate(account_id, BalanceChange::Credit(amount), draft)
            .await?;

        tracing::info!(
            account_id = %account_id,
            amount,
            balance = record.balance_after,
            reason,
            "Credits granted by admin"
        );
        Ok(record)
    }

    /// Grant the credits of a purchased pack.
    pub async fn purchase(
        &self,
        account_id: &AccountId,
        pack: &CreditPack,
    ) -> Result<TransactionRecord> {
        let metadata = Metadata::new()
            .with(keys::PACK_ID, pack.id.as_str())
            .with(keys::SOURCE, "purchase");
        self.grant(account_id, pack.credits, &pack.purchase_reason(), metadata)
            .await
    }

    /// Current balance.
    pub async fn balance_of(&self, account_id: &AccountId) -> Result<i64> {
        if let Some(account) = self.store.get_account(account_id).await? {
            return Ok(account.balance);
        }
        match self.policy {
            InitPolicy::OnFirstUse { credits } => {
                Ok(self.initialize(account_id, credits).await?.account.balance)
            }
            InitPolicy::Explicit => Ok(0),
        }
    }

    /// The account row, if it exists. Never writes.
    pub async fn account(&self, account_id: &AccountId) -> Result<Option<AccountBalance>> {
        Ok(self.store.get_account(account_id).await?)
    }

    /// The `limit` most recent records, newest first. Never writes.
    pub async fn history_of(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        self.history_page(account_id, limit, 0).await
    }

    /// A page of records, newest first. Never writes.
    pub async fn history_page(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .store
            .list_transactions(account_id, limit, offset)
            .await?)
    }

    /// All balances, most recently created first.
    pub async fn accounts(&self, limit: usize, offset: usize) -> Result<Vec<AccountBalance>> {
        Ok(self.store.list_accounts(limit, offset).await?)
    }

    /// Replay the account's log and compare it with the stored balance.
    pub async fn audit(&self, account_id: &AccountId) -> Result<AuditReport> {
        let account = self
            .store
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound {
                account_id: account_id.to_string(),
            })?;

        // Records appended after the account was read are ignored.
        let mut records: Vec<_> = self
            .store
            .list_transactions(account_id, usize::MAX, 0)
            .await?
            .into_iter()
            .filter(|r| r.sequence <= account.version)
            .collect();
        records.reverse();

        let mut replayed_balance = 0_i64;
        let mut chain_intact = true;
        let mut unbalanced = Vec::new();
        for (expected_sequence, record) in (1_i64..).zip(&records) {
            if record.sequence != expected_sequence || record.balance_before != replayed_balance {
                chain_intact = false;
            }
            if !record.is_balanced() {
                unbalanced.push(record.id);
            }
            replayed_balance = replayed_balance.saturating_add(record.amount);
        }

        let report = AuditReport {
            account_id: *account_id,
            balance: account.balance,
            replayed_balance,
            records: records.len(),
            unbalanced,
            chain_intact,
        };
        if !report.is_consistent() {
            tracing::error!(
                account_id = %account_id,
                balance = report.balance,
                replayed_balance = report.replayed_balance,
                "Ledger audit failed"
            );
        }
        Ok(report)
    }

    /// Apply a change, initializing the account first when the policy allows.
    async fn mutate(
        &self,
        account_id: &AccountId,
        change: BalanceChange,
        draft: TransactionDraft,
    ) -> Result<TransactionRecord> {
        match self.store.apply(account_id, change, draft.clone()).await {
            Err(StoreError::NotFound { account_id: missing }) => match self.policy {
                InitPolicy::OnFirstUse { credits } => {
                    self.initialize(account_id, credits).await?;
                    Ok(self.store.apply(account_id, change, draft).await?)
                }
                InitPolicy::Explicit => Err(LedgerError::AccountNotFound {
                    account_id: missing,
                }),
            },
            other => Ok(other?),
        }
    }
}

fn require_positive(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}
