//! Key encoding utilities for `RocksDB`.

use ledger_core::{AccountId, TransactionId};

/// Create an account key from an account ID.
#[must_use]
pub fn account_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create an account-sequence index key.
///
/// Format: `account_id (16 bytes) || sequence (8 bytes, big-endian)`
///
/// Big-endian sequences sort numerically, so a prefix scan yields an account's
/// records in the order they were appended.
#[must_use]
pub fn account_sequence_key(account_id: &AccountId, sequence: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(account_id.as_bytes());
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

/// Create a prefix for iterating all records of an account.
#[must_use]
pub fn account_prefix(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Decode a transaction ID stored as an index value.
#[must_use]
pub fn decode_transaction_id(value: &[u8]) -> Option<TransactionId> {
    let bytes: [u8; 16] = value.try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_keys_sort_numerically() {
        let account = AccountId::generate();
        let k2 = account_sequence_key(&account, 2);
        let k10 = account_sequence_key(&account, 10);
        assert!(k2 < k10);
        assert!(k10.starts_with(&account_prefix(&account)));
        assert_eq!(k10.len(), 24);
    }

    #[test]
    fn transaction_id_value_decodes() {
        let id = TransactionId::generate();
        assert_eq!(decode_transaction_id(&transaction_key(&id)), Some(id));
        assert_eq!(decode_transaction_id(&[1, 2, 3]), None);
    }
}
