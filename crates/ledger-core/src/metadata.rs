//! Traceability metadata attached to transaction records.
//!
//! Metadata is an open key-value payload. The keys below are the ones the ledger
//! itself writes; callers may add any others and they are stored verbatim.
//!
//! | key              | written by                         | value            |
//! |------------------|------------------------------------|------------------|
//! | `feature`        | feature gate                       | feature name     |
//! | `invocation_id`  | feature gate                       | UUID v4 string   |
//! | `pack_id`        | purchases                          | credit pack id   |
//! | `source`         | service-to-service consumption     | caller name      |
//! | `admin_id`       | admin override                     | admin identifier |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known metadata keys.
pub mod keys {
    /// Name of the priced feature that triggered the transaction.
    pub const FEATURE: &str = "feature";
    /// Identifier of the gated invocation.
    pub const INVOCATION_ID: &str = "invocation_id";
    /// Credit pack purchased.
    pub const PACK_ID: &str = "pack_id";
    /// Calling service for service-to-service consumption.
    pub const SOURCE: &str = "source";
    /// Administrator who performed an override.
    pub const ADMIN_ID: &str = "admin_id";
}

/// Structured, extensible metadata for a transaction record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, serde_json::Value>);

impl Metadata {
    /// Create empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace a key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Look up a key holding a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(serde_json::Value::as_str)
    }

    /// Whether no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.0.clone().into_iter().collect())
    }

    /// Build metadata from a JSON value. Non-object values yield empty metadata.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self(map.into_iter().collect()),
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_survive_json_roundtrip() {
        let metadata = Metadata::new()
            .with(keys::FEATURE, "business_analysis")
            .with("client_version", 3);
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["client_version"], 3);

        let back: Metadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn non_object_json_is_empty() {
        assert!(Metadata::from_json(serde_json::Value::Null).is_empty());
        assert!(Metadata::from_json(serde_json::json!([1, 2])).is_empty());
    }
}
