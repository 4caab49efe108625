//! Account balance types.
//!
//! An account balance is the singleton row the ledger keeps per account. It is
//! created once, mutated only by the ledger service, and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

// ============================================================================
// Policy constants
// ============================================================================

/// Credits granted to an account the first time it is initialized.
pub const DEFAULT_INITIAL_CREDITS: i64 = 50;

/// Credits consumed by one AI analysis.
pub const DEFAULT_ANALYSIS_COST: i64 = 5;

/// The current credit balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account this balance belongs to.
    pub account_id: AccountId,

    /// Current balance in credits. Never negative.
    pub balance: i64,

    /// Number of mutations applied so far. Equals the `sequence` of the
    /// account's most recent transaction record.
    pub version: i64,

    /// When the account was first initialized.
    pub created_at: DateTime<Utc>,

    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

impl AccountBalance {
    /// Create a freshly initialized balance (version 1, the INITIALIZE record).
    #[must_use]
    pub fn new(account_id: AccountId, balance: i64) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            balance,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}
