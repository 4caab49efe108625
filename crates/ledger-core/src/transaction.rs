//! Transaction records: the append-only audit trail of balance changes.
//!
//! Every balance mutation appends exactly one record in the same atomic unit,
//! and `balance_after = balance_before + amount` holds for every record.
//! Replaying an account's records in `sequence` order from zero reproduces its
//! current balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Metadata, TransactionId};

/// Kind of balance-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// First creation of the account balance.
    Initialize,
    /// Credits spent on a priced feature.
    Consume,
    /// Non-consuming increase (purchase, bonus).
    Grant,
    /// Administrative correction to an absolute value.
    AdminSet,
    /// Administrative grant.
    AdminGrant,
}

impl TransactionKind {
    /// Stable lowercase name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Consume => "consume",
            Self::Grant => "grant",
            Self::AdminSet => "admin_set",
            Self::AdminGrant => "admin_grant",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initialize" => Ok(Self::Initialize),
            "consume" => Ok(Self::Consume),
            "grant" => Ok(Self::Grant),
            "admin_set" => Ok(Self::AdminSet),
            "admin_grant" => Ok(Self::AdminGrant),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// How a mutation changes the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    /// Subtract an amount; rejected when the balance is lower.
    Debit(i64),
    /// Add an amount.
    Credit(i64),
    /// Replace the balance with an absolute value.
    Set(i64),
}

impl BalanceChange {
    /// Compute the balance after applying this change to `before`.
    ///
    /// # Errors
    ///
    /// - `ChangeError::Insufficient` when a debit exceeds the balance.
    /// - `ChangeError::Overflow` when the result does not fit in an `i64`.
    pub fn resolve(self, before: i64) -> Result<i64, ChangeError> {
        match self {
            Self::Debit(amount) if before < amount => Err(ChangeError::Insufficient {
                balance: before,
                required: amount,
            }),
            Self::Debit(amount) => before.checked_sub(amount).ok_or(ChangeError::Overflow),
            Self::Credit(amount) => before.checked_add(amount).ok_or(ChangeError::Overflow),
            Self::Set(value) => Ok(value),
        }
    }
}

/// Why a [`BalanceChange`] could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChangeError {
    /// Debit larger than the current balance.
    #[error("insufficient credits: balance={balance}, required={required}")]
    Insufficient {
        /// Balance at the time of the attempt.
        balance: i64,
        /// Amount requested.
        required: i64,
    },

    /// Arithmetic overflow.
    #[error("balance overflow")]
    Overflow,
}

/// The caller-supplied part of a record; the store fills in balances,
/// identifiers and the sequence number inside its atomic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    /// Kind of event.
    pub kind: TransactionKind,
    /// Free-text reason.
    pub description: String,
    /// Traceability payload.
    pub metadata: Metadata,
}

impl TransactionDraft {
    /// Create a draft with empty metadata.
    #[must_use]
    pub fn new(kind: TransactionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Materialize the record for a change from `balance_before` to `balance_after`.
    #[must_use]
    pub fn into_record(
        self,
        account_id: AccountId,
        balance_before: i64,
        balance_after: i64,
        sequence: i64,
        created_at: DateTime<Utc>,
    ) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId::generate(),
            account_id,
            kind: self.kind,
            amount: balance_after - balance_before,
            balance_before,
            balance_after,
            sequence,
            description: self.description,
            metadata: self.metadata,
            created_at,
        }
    }
}

/// One immutable entry in an account's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique record ID.
    pub id: TransactionId,

    /// The account whose balance changed.
    pub account_id: AccountId,

    /// Kind of event.
    pub kind: TransactionKind,

    /// Signed change: negative for consumption.
    pub amount: i64,

    /// Balance before the change.
    pub balance_before: i64,

    /// Balance after the change.
    pub balance_after: i64,

    /// Position in the account's log, starting at 1.
    pub sequence: i64,

    /// Human-readable reason.
    pub description: String,

    /// Traceability payload.
    pub metadata: Metadata,

    /// When the record was appended.
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Whether the record satisfies `balance_after = balance_before + amount`.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.balance_before.checked_add(self.amount) == Some(self.balance_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_rejects_overdraft() {
        assert_eq!(
            BalanceChange::Debit(6).resolve(5),
            Err(ChangeError::Insufficient {
                balance: 5,
                required: 6
            })
        );
        assert_eq!(BalanceChange::Debit(5).resolve(5), Ok(0));
    }

    #[test]
    fn credit_detects_overflow() {
        assert_eq!(
            BalanceChange::Credit(1).resolve(i64::MAX),
            Err(ChangeError::Overflow)
        );
    }

    #[test]
    fn set_computes_signed_amount() {
        let record = TransactionDraft::new(TransactionKind::AdminSet, "correction").into_record(
            AccountId::generate(),
            120,
            BalanceChange::Set(1000).resolve(120).unwrap(),
            4,
            Utc::now(),
        );
        assert_eq!(record.amount, 880);
        assert_eq!(record.balance_after, 1000);
        assert!(record.is_balanced());
    }

    #[test]
    fn consume_record_amount_is_negative() {
        let record = TransactionDraft::new(TransactionKind::Consume, "analysis").into_record(
            AccountId::generate(),
            50,
            45,
            2,
            Utc::now(),
        );
        assert_eq!(record.amount, -5);
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in [
            TransactionKind::Initialize,
            TransactionKind::Consume,
            TransactionKind::Grant,
            TransactionKind::AdminSet,
            TransactionKind::AdminGrant,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionKind>(), Ok(kind));
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::json!(kind.as_str())
            );
        }
    }
}
