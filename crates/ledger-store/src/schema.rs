//! Schema definitions shared by the backends.

/// PostgreSQL table names (see `migrations/`).
pub mod table {
    /// One row per account, keyed by `account_id`.
    pub const ACCOUNT_BALANCES: &str = "account_balances";

    /// Append-only transaction log.
    pub const CREDIT_TRANSACTIONS: &str = "credit_transactions";
}

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account balances, keyed by `account_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Transaction records, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: records by account, keyed by `account_id || sequence (big-endian)`.
    /// Value is the transaction ID.
    pub const TRANSACTIONS_BY_ACCOUNT: &str = "transactions_by_account";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::ACCOUNTS, cf::TRANSACTIONS, cf::TRANSACTIONS_BY_ACCOUNT]
}
