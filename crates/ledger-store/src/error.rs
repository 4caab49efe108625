//! Error types for ledger storage.

use ledger_core::{ChangeError, LedgerError};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed (connection, timeout, constraint, commit).
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The account has no balance row.
    #[error("account not found: {account_id}")]
    NotFound {
        /// The missing account.
        account_id: String,
    },

    /// Debit larger than the balance; nothing was written.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Balance observed inside the atomic unit.
        balance: i64,
        /// Amount requested.
        required: i64,
    },

    /// The resulting balance would overflow.
    #[error("balance overflow")]
    Overflow,
}

impl From<ChangeError> for StoreError {
    fn from(err: ChangeError) -> Self {
        match err {
            ChangeError::Insufficient { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            ChangeError::Overflow => Self::Overflow,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(msg) => Self::StoreUnavailable(msg),
            StoreError::Serialization(msg) => Self::Corrupted(msg),
            StoreError::NotFound { account_id } => Self::AccountNotFound { account_id },
            StoreError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            StoreError::Overflow => Self::InvalidAmount("balance would overflow".into()),
        }
    }
}
