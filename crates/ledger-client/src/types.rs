//! Request and response types for the ledger client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledger_core::{CreditPack, Metadata, TransactionKind};

/// Service request to charge an account.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumeRequest {
    /// Account being charged.
    pub account_id: String,
    /// Credits to deduct (strictly positive).
    pub amount: i64,
    /// Human-readable reason recorded on the transaction.
    pub reason: String,
    /// Traceability payload.
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// A committed transaction as returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: String,
    /// Transaction kind.
    pub kind: TransactionKind,
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
    #[serde(default)]
    pub metadata: Metadata,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}

/// Response to a consume request.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumeResponse {
    /// Balance after the charge.
    pub balance: i64,
    /// The CONSUME record.
    pub transaction: Transaction,
}

/// Current balance of the caller's account.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// Account ID.
    pub account_id: String,
    /// Current balance in credits.
    pub balance: i64,
}

/// A page of transaction history, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPage {
    /// Transactions on this page.
    pub transactions: Vec<Transaction>,
    /// Whether older transactions remain.
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub kind: &'a str,
    pub input: &'a serde_json::Value,
}

/// Output of a priced analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisReport {
    /// Analysis kind (`business`, `website` or `document`).
    pub kind: String,
    /// Model that produced the result.
    pub model: String,
    /// Whether the fallback model answered.
    pub fallback_used: bool,
    /// Structured result.
    pub result: serde_json::Value,
}

/// Response to an analysis request.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    /// The analysis output.
    pub report: AnalysisReport,
    /// Credits charged for this run.
    pub credits_charged: i64,
    /// Balance after the charge.
    pub balance: i64,
    /// ID of the CONSUME record.
    pub transaction_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PacksResponse {
    pub packs: Vec<CreditPack>,
}

/// Error envelope returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ApiErrorBody {
    pub(crate) fn detail_i64(&self, key: &str) -> i64 {
        self.details
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0)
    }

    pub(crate) fn detail_str(&self, key: &str) -> Option<String> {
        self.details
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    }
}
