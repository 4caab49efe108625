//! Credit packs.
//!
//! The catalog is owned by the pricing collaborator; the ledger only needs a
//! pack's credit amount to grant after a purchase completes. The built-in
//! catalog below is used when no other catalog is configured.

use serde::{Deserialize, Serialize};

/// A purchasable bundle of credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPack {
    /// Stable identifier (e.g. `starter`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Credits granted on purchase.
    pub credits: i64,
    /// Price in euro cents.
    pub price_cents: i64,
    /// Highlighted in the storefront.
    #[serde(default)]
    pub popular: bool,
}

impl CreditPack {
    fn builtin(id: &str, name: &str, credits: i64, price_cents: i64, popular: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            credits,
            price_cents,
            popular,
        }
    }

    /// Reason string recorded on the GRANT produced by buying this pack.
    #[must_use]
    pub fn purchase_reason(&self) -> String {
        format!("purchase:{}", self.id)
    }
}

/// The built-in fallback catalog.
#[must_use]
pub fn default_packs() -> Vec<CreditPack> {
    vec![
        CreditPack::builtin("starter", "Starter", 100, 1000, false),
        CreditPack::builtin("professional", "Professional", 500, 4500, true),
        CreditPack::builtin("enterprise", "Enterprise", 2000, 15000, false),
    ]
}

/// Find a pack by id.
#[must_use]
pub fn find_pack<'a>(packs: &'a [CreditPack], id: &str) -> Option<&'a CreditPack> {
    packs.iter().find(|p| p.id == id)
}
