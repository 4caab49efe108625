//! API handlers.

pub mod admin;
pub mod analyses;
pub mod credits;
pub mod health;
pub mod usage;

use serde::{Deserialize, Serialize};

use ledger_core::{Metadata, TransactionRecord};

/// Largest page any listing endpoint returns.
pub const MAX_PAGE_SIZE: usize = 100;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Maximum number of items to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

impl PageQuery {
    /// The limit clamped to [`MAX_PAGE_SIZE`].
    #[must_use]
    pub fn clamped_limit(&self) -> usize {
        self.limit.min(MAX_PAGE_SIZE)
    }
}

fn default_limit() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Transaction kind.
    pub kind: String,
    /// Signed amount (negative for consumption).
    pub amount: i64,
    /// Balance before this transaction.
    pub balance_before: i64,
    /// Balance after this transaction.
    pub balance_after: i64,
    /// Position in the account's log.
    pub sequence: i64,
    /// Description.
    pub description: String,
    /// Traceability payload.
    pub metadata: Metadata,
    /// Timestamp.
    pub created_at: String,
}

impl From<&TransactionRecord> for TransactionResponse {
    fn from(tx: &TransactionRecord) -> Self {
        Self {
            id: tx.id.to_string(),
            kind: tx.kind.to_string(),
            amount: tx.amount,
            balance_before: tx.balance_before,
            balance_after: tx.balance_after,
            sequence: tx.sequence,
            description: tx.description.clone(),
            metadata: tx.metadata.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}
