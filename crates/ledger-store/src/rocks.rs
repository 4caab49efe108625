//! `RocksDB` storage implementation.
//!
//! Uses a pessimistic `TransactionDB`: every mutation takes an exclusive lock on
//! the account key with `get_for_update`, computes the new balance, and writes
//! the account, the record and the index entry in one commit. A transaction
//! dropped before commit is rolled back. Locks are process-local, so a single
//! process must own the data directory.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, MultiThreaded, Options,
    TransactionDB, TransactionDBOptions,
};

use ledger_core::{
    AccountBalance, AccountId, BalanceChange, TransactionDraft, TransactionId, TransactionRecord,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Initialized, Store};

fn db_err(e: rocksdb::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<TransactionDB<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &TransactionDBOptions::default(),
            path,
            cf_descriptors,
        )
        .map_err(db_err)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Write an account, a record and its index entry inside `txn`.
    fn stage(
        &self,
        txn: &rocksdb::Transaction<'_, TransactionDB<MultiThreaded>>,
        account: &AccountBalance,
        record: &TransactionRecord,
    ) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_index = self.cf(cf::TRANSACTIONS_BY_ACCOUNT)?;

        txn.put_cf(
            &cf_accounts,
            keys::account_key(&account.account_id),
            Self::serialize(account)?,
        )
        .map_err(db_err)?;
        txn.put_cf(
            &cf_tx,
            keys::transaction_key(&record.id),
            Self::serialize(record)?,
        )
        .map_err(db_err)?;
        txn.put_cf(
            &cf_index,
            keys::account_sequence_key(&record.account_id, record.sequence),
            keys::transaction_key(&record.id),
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl Store for RocksStore {
    async fn get_account(&self, account_id: &AccountId) -> Result<Option<AccountBalance>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        self.db
            .get_cf(&cf, keys::account_key(account_id))
            .map_err(db_err)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    async fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<AccountBalance>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(db_err)?;
            accounts.push(Self::deserialize::<AccountBalance>(&value)?);
        }
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
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let txn = self.db.transaction();

        if let Some(existing) = txn
            .get_for_update_cf(&cf_accounts, keys::account_key(account_id), true)
            .map_err(db_err)?
        {
            return Ok(Initialized {
                account: Self::deserialize(&existing)?,
                record: None,
            });
        }

        let account = AccountBalance::new(*account_id, initial_credits);
        let record = draft.into_record(*account_id, 0, initial_credits, 1, account.created_at);
        self.stage(&txn, &account, &record)?;
        txn.commit().map_err(db_err)?;

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
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let txn = self.db.transaction();

        let data = txn
            .get_for_update_cf(&cf_accounts, keys::account_key(account_id), true)
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound {
                account_id: account_id.to_string(),
            })?;
        let mut account: AccountBalance = Self::deserialize(&data)?;

        let before = account.balance;
        let after = change.resolve(before)?;
        let now = Utc::now();

        account.balance = after;
        account.version += 1;
        account.updated_at = now;

        let record = draft.into_record(*account_id, before, after, account.version, now);
        self.stage(&txn, &account, &record)?;
        txn.commit().map_err(db_err)?;

        Ok(record)
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<TransactionRecord>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        self.db
            .get_cf(&cf, keys::transaction_key(id))
            .map_err(db_err)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    async fn list_transactions(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let cf_index = self.cf(cf::TRANSACTIONS_BY_ACCOUNT)?;
        let prefix = keys::account_prefix(account_id);

        let mut ids = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf_index, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(db_err)?;
            if !key.starts_with(&prefix) {
                break;
            }
            let id = keys::decode_transaction_id(&value)
                .ok_or_else(|| StoreError::Serialization("malformed index entry".into()))?;
            ids.push(id);
        }

        let mut records = Vec::new();
        for id in ids.iter().rev().skip(offset).take(limit) {
            if let Some(record) = self.get_transaction(id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
