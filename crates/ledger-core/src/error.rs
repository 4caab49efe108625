//! Error types for the ledger.

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The account has no balance and auto-initialization did not apply.
    #[error("account not found: {account_id}")]
    AccountNotFound {
        /// The account that was not found.
        account_id: String,
    },

    /// The balance does not cover the requested consumption.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Balance at the time of the attempt.
        balance: i64,
        /// Amount requested.
        required: i64,
    },

    /// A non-positive amount (or negative absolute balance) was supplied.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The store could not complete the operation. The mutation may not be
    /// assumed to have happened.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Stored data could not be decoded.
    #[error("corrupted ledger data: {0}")]
    Corrupted(String),

    /// An admin override was attempted without an admin assertion.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl LedgerError {
    /// Whether the end user can resolve this error themselves (for instance by
    /// buying credits), as opposed to an operational failure.
    #[must_use]
    pub const fn is_user_actionable(&self) -> bool {
        matches!(self, Self::InsufficientCredits { .. })
    }

    /// Message suitable for showing to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientCredits { balance, required } => format!(
                "You need {required} credits for this action but have {balance}. Purchase more credits to continue."
            ),
            Self::InvalidAmount(msg) => format!("Invalid amount: {msg}"),
            Self::AccountNotFound { .. } => "No credit account exists for this user.".to_string(),
            Self::NotAuthorized(_) => "This action requires administrator rights.".to_string(),
            Self::InvalidId(e) => format!("Invalid identifier: {e}"),
            Self::StoreUnavailable(_) | Self::Corrupted(_) => {
                "The credit system is temporarily unavailable. Please try again later.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_insufficient_credits_is_user_actionable() {
        assert!(LedgerError::InsufficientCredits {
            balance: 0,
            required: 5
        }
        .is_user_actionable());
        assert!(!LedgerError::StoreUnavailable("timeout".into()).is_user_actionable());
    }

    #[test]
    fn messages_distinguish_business_outcome_from_failure() {
        let insufficient = LedgerError::InsufficientCredits {
            balance: 2,
            required: 5,
        }
        .user_message();
        let failure = LedgerError::StoreUnavailable("connection reset".into()).user_message();

        assert!(insufficient.contains("Purchase more credits"));
        assert!(failure.contains("temporarily unavailable"));
        assert!(!failure.contains("connection reset"));
    }
}
