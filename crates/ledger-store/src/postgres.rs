//! PostgreSQL storage implementation.
//!
//! Atomicity comes from PostgreSQL transactions. `apply` locks the account row
//! with `SELECT ... FOR UPDATE`, so concurrent mutations of one account
//! serialize in the database regardless of how many service replicas issue
//! them. `create_account` relies on the primary key: `INSERT ... ON CONFLICT DO
//! NOTHING` lets exactly one writer create the row. If a future is dropped
//! before commit, the `sqlx` transaction rolls back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use ledger_core::{
    AccountBalance, AccountId, BalanceChange, Metadata, TransactionDraft, TransactionId,
    TransactionKind, TransactionRecord,
};

use crate::error::{Result, StoreError};
use crate::schema::table::{ACCOUNT_BALANCES, CREDIT_TRANSACTIONS};
use crate::{Initialized, Store};

/// Default time to wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum pool size.
const MAX_CONNECTIONS: u32 = 10;

const ACCOUNT_COLUMNS: &str = "account_id, balance, version, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, account_id, kind, amount, balance_before, balance_after, \
     sequence, description, metadata, created_at";

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL and run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or a migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("Ledger schema migrations applied");
        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Result<AccountBalance> {
    Ok(AccountBalance {
        account_id: AccountId::from_uuid(row.try_get("account_id")?),
        balance: row.try_get("balance")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<TransactionRecord> {
    let kind: String = row.try_get("kind")?;
    let metadata: serde_json::Value = row.try_get("metadata")?;

    Ok(TransactionRecord {
        id: TransactionId::from_uuid(row.try_get("id")?),
        account_id: AccountId::from_uuid(row.try_get("account_id")?),
        kind: kind
            .parse::<TransactionKind>()
            .map_err(StoreError::Serialization)?,
        amount: row.try_get("amount")?,
        balance_before: row.try_get("balance_before")?,
        balance_after: row.try_get("balance_after")?,
        sequence: row.try_get("sequence")?,
        description: row.try_get("description")?,
        metadata: Metadata::from_json(metadata),
        created_at: row.try_get("created_at")?,
    })
}

async fn insert_transaction<'c, E>(executor: E, record: &TransactionRecord) -> Result<()>
where
    E: sqlx::PgExecutor<'c>,
{
    sqlx::query(&format!(
        "INSERT INTO {CREDIT_TRANSACTIONS} ({TRANSACTION_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
    ))
    .bind(record.id.to_uuid())
    .bind(record.account_id.as_uuid())
    .bind(record.kind.as_str())
    .bind(record.amount)
    .bind(record.balance_before)
    .bind(record.balance_after)
    .bind(record.sequence)
    .bind(&record.description)
    .bind(record.metadata.to_json())
    .bind(record.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for PgStore {
    async fn get_account(&self, account_id: &AccountId) -> Result<Option<AccountBalance>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM {ACCOUNT_BALANCES} WHERE account_id = $1"
        ))
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<AccountBalance>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM {ACCOUNT_BALANCES} \
             ORDER BY created_at DESC, account_id LIMIT $1 OFFSET $2"
        ))
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    async fn create_account(
        &self,
        account_id: &AccountId,
        initial_credits: i64,
        draft: TransactionDraft,
    ) -> Result<Initialized> {
        let now: DateTime<Utc> = Utc::now();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO {ACCOUNT_BALANCES} (account_id, balance, version, created_at, updated_at) \
             VALUES ($1, $2, 1, $3, $3) \
             ON CONFLICT (account_id) DO NOTHING \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account_id.as_uuid())
        .bind(initial_credits)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = inserted else {
            // Another writer created the account first.
            tx.rollback().await?;
            let account = self
                .get_account(account_id)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    account_id: account_id.to_string(),
                })?;
            return Ok(Initialized {
                account,
                record: None,
            });
        };

        let account = account_from_row(&row)?;
        let record = draft.into_record(*account_id, 0, initial_credits, 1, now);
        insert_transaction(&mut *tx, &record).await?;
        tx.commit().await?;

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
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT balance, version FROM {ACCOUNT_BALANCES} WHERE account_id = $1 FOR UPDATE"
        ))
        .bind(account_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            account_id: account_id.to_string(),
        })?;

        let before: i64 = row.try_get("balance")?;
        let version: i64 = row.try_get("version")?;
        // Dropping `tx` on this early return rolls back and releases the lock.
        let after = change.resolve(before)?;
        let sequence = version + 1;
        let now = Utc::now();

        sqlx::query(&format!(
            "UPDATE {ACCOUNT_BALANCES} SET balance = $2, version = $3, updated_at = $4 \
             WHERE account_id = $1"
        ))
        .bind(account_id.as_uuid())
        .bind(after)
        .bind(sequence)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let record = draft.into_record(*account_id, before, after, sequence, now);
        insert_transaction(&mut *tx, &record).await?;
        tx.commit().await?;

        Ok(record)
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<TransactionRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM {CREDIT_TRANSACTIONS} WHERE id = $1"
        ))
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn list_transactions(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM {CREDIT_TRANSACTIONS} \
             WHERE account_id = $1 ORDER BY sequence DESC LIMIT $2 OFFSET $3"
        ))
        .bind(account_id.as_uuid())
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }
}
