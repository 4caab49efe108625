//! In-memory storage implementation.
//!
//! Every operation runs inside one critical section of a single async mutex,
//! which makes it atomic within this process only. Use it for tests and local
//! development; deployments with more than one replica need [`crate::PgStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use ledger_core::{
    AccountBalance, AccountId, BalanceChange, TransactionDraft, TransactionId, TransactionRecord,
};

use crate::error::{Result, StoreError};
use crate::{Initialized, Store};

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, AccountBalance>,
    transactions: HashMap<TransactionId, TransactionRecord>,
    /// Record IDs per account in sequence order.
    by_account: HashMap<AccountId, Vec<TransactionId>>,
}

impl Inner {
    fn append(&mut self, record: TransactionRecord) {
        self.by_account
            .entry(record.account_id)
            .or_default()
            .push(record.id);
        self.transactions.insert(record.id, record);
    }
}

/// Memory-backed storage implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_account(&self, account_id: &AccountId) -> Result<Option<AccountBalance>> {
        Ok(self.inner.lock().await.accounts.get(account_id).cloned())
    }

    async fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<AccountBalance>> {
        let inner = self.inner.lock().await;
        let mut accounts: Vec<_> = inner.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });
        Ok(accounts.into_iter().skip(offset).take(limit).collect())
    }

    async fn create_account(
        &self,
        account_id: &AccountId,
        initial_credits: i64,
        draft: TransactionDraft,
    ) -> Result<Initialized> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner.accounts.get(account_id) {
            return Ok(Initialized {
                account: existing.clone(),
                record: None,
            });
        }

        let account = AccountBalance::new(*account_id, initial_credits);
        let record = draft.into_record(*account_id, 0, initial_credits, 1, account.created_at);

        inner.accounts.insert(*account_id, account.clone());
        inner.append(record.clone());

        Ok(Initialized {
            account,
            record: Some(record),
        })
    }

    async fn apply(
        &self,
        account_id: &AccountId,
        change: BalanceChange,
        draft: TransactionDraft,
    ) -> Result<TransactionRecord> {
        let mut inner = self.inner.lock().await;

        let account = inner
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StoreError::NotFound {
                account_id: account_id.to_string(),
            })?;

        let before = account.balance;
        let after = change.resolve(before)?;
        let now = Utc::now();

        account.balance = after;
        account.version += 1;
        account.updated_at = now;
        let sequence = account.version;

        let record = draft.into_record(*account_id, before, after, sequence, now);
        inner.append(record.clone());

        Ok(record)
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<TransactionRecord>> {
        Ok(self.inner.lock().await.transactions.get(id).cloned())
    }

    async fn list_transactions(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let inner = self.inner.lock().await;
        let Some(ids) = inner.by_account.get(account_id) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .filter_map(|id| inner.transactions.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use ledger_core::TransactionKind;

    fn initialize() -> TransactionDraft {
        TransactionDraft::new(TransactionKind::Initialize, "welcome")
    }

    fn consume() -> TransactionDraft {
        TransactionDraft::new(TransactionKind::Consume, "analysis")
    }

    #[tokio::test]
    async fn create_account_is_insert_if_absent() {
        let store = MemoryStore::new();
        let account = AccountId::generate();

        let first = store.create_account(&account, 50, initialize()).await.unwrap();
        assert!(first.created());
        assert_eq!(first.account.balance, 50);

        let second = store.create_account(&account, 999, initialize()).await.unwrap();
        assert!(!second.created());
        assert_eq!(second.account.balance, 50);

        let log = store.list_transactions(&account, 10, 0).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].balance_before, 0);
        assert_eq!(log[0].sequence, 1);
    }

    #[tokio::test]
    async fn apply_on_unknown_account_fails() {
        let store = MemoryStore::new();
        let result = store
            .apply(&AccountId::generate(), BalanceChange::Credit(5), consume())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn rejected_debit_writes_nothing() {
        let store = MemoryStore::new();
        let account = AccountId::generate();
        store.create_account(&account, 3, initialize()).await.unwrap();

        let result = store.apply(&account, BalanceChange::Debit(5), consume()).await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 3,
                required: 5
            })
        ));

        let stored = store.get_account(&account).await.unwrap().unwrap();
        assert_eq!(stored.balance, 3);
        assert_eq!(stored.version, 1);
        assert_eq!(store.list_transactions(&account, 10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transactions_are_listed_newest_first_with_pagination() {
        let store = MemoryStore::new();
        let account = AccountId::generate();
        store.create_account(&account, 50, initialize()).await.unwrap();
        store
            .apply(&account, BalanceChange::Debit(5), consume())
            .await
            .unwrap();
        store
            .apply(
                &account,
                BalanceChange::Credit(100),
                TransactionDraft::new(TransactionKind::Grant, "purchase:starter"),
            )
            .await
            .unwrap();

        let page1 = store.list_transactions(&account, 2, 0).await.unwrap();
        let page2 = store.list_transactions(&account, 2, 2).await.unwrap();

        assert_eq!(
            page1.iter().map(|r| r.sequence).collect::<Vec<_>>(),
            vec![3, 2]
        );
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].kind, TransactionKind::Initialize);

        let fetched = store.get_transaction(&page1[0].id).await.unwrap().unwrap();
        assert_eq!(fetched.balance_after, 145);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_debits_never_overdraw() {
        let store = Arc::new(MemoryStore::new());
        let account = AccountId::generate();
        store.create_account(&account, 5, initialize()).await.unwrap();

        let attempts = (0..2).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .apply(&account, BalanceChange::Debit(5), consume())
                    .await
            })
        });
        let results = futures::future::join_all(attempts).await;

        let successes = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(StoreError::InsufficientCredits { .. }))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(rejected, 1);
        assert_eq!(store.get_account(&account).await.unwrap().unwrap().balance, 0);
    }

    #[tokio::test]
    async fn list_accounts_paginates() {
        let store = MemoryStore::new();
        for _ in 0..3 {
            store
                .create_account(&AccountId::generate(), 50, initialize())
                .await
                .unwrap();
        }
        assert_eq!(store.list_accounts(2, 0).await.unwrap().len(), 2);
        assert_eq!(store.list_accounts(2, 2).await.unwrap().len(), 1);
    }
}
