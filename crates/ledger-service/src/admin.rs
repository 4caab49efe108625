//! Admin Override: privileged balance corrections.
//!
//! Authorization is decided by the caller; the override only checks the
//! asserted `is_admin` flag, then goes through the same [`Ledger`] operations
//! as everything else so the audit trail stays complete. Every record it
//! produces carries the acting admin in its metadata.

use std::sync::Arc;

use ledger_core::metadata::keys;
use ledger_core::{AccountBalance, AccountId, LedgerError, Metadata, Result, TransactionRecord};

use crate::ledger::{AuditReport, Ledger};

/// Who is performing an admin action, as asserted by the authorization layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    /// Identifier recorded in the audit trail.
    pub admin_id: String,
    /// Whether the caller holds the admin capability.
    pub is_admin: bool,
}

impl AdminContext {
    /// A context for a verified admin.
    #[must_use]
    pub fn admin(admin_id: impl Into<String>) -> Self {
        Self {
            admin_id: admin_id.into(),
            is_admin: true,
        }
    }

    fn authorize(&self) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            tracing::warn!(admin_id = %self.admin_id, "Admin action refused");
            Err(LedgerError::NotAuthorized(format!(
                "{} is not an administrator",
                self.admin_id
            )))
        }
    }

    fn metadata(&self) -> Metadata {
        Metadata::new()
            .with(keys::ADMIN_ID, self.admin_id.as_str())
            .with(keys::SOURCE, "admin")
    }
}

/// Privileged operations over the ledger.
#[derive(Clone)]
pub struct AdminOverride {
    ledger: Arc<Ledger>,
}

impl AdminOverride {
    /// Create an override over `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Set an absolute balance (ADMIN_SET).
    pub async fn set_balance(
        &self,
        ctx: &AdminContext,
        account_id: &AccountId,
        new_balance: i64,
        reason: &str,
    ) -> Result<TransactionRecord> {
        ctx.authorize()?;
        self.ledger
            .admin_set(account_id, new_balance, reason, ctx.metadata())
            .await
    }

    /// Add credits (ADMIN_GRANT).
    pub async fn grant(
        &self,
        ctx: &AdminContext,
        account_id: &AccountId,
        amount: i64,
        reason: &str,
    ) -> Result<TransactionRecord> {
        ctx.authorize()?;
        self.ledger
            .admin_grant(account_id, amount, reason, ctx.metadata())
            .await
    }

    /// List all balances.
    pub async fn list_accounts(
        &self,
        ctx: &AdminContext,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AccountBalance>> {
        ctx.authorize()?;
        self.ledger.accounts(limit, offset).await
    }

    /// Replay an account's log.
    pub async fn audit(&self, ctx: &AdminContext, account_id: &AccountId) -> Result<AuditReport> {
        ctx.authorize()?;
        self.ledger.audit(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InitPolicy;
    use ledger_core::TransactionKind;
    use ledger_store::MemoryStore;

    fn admin_override() -> AdminOverride {
        AdminOverride::new(Arc::new(Ledger::new(
            Arc::new(MemoryStore::new()),
            InitPolicy::default(),
        )))
    }

    #[tokio::test]
    async fn non_admin_is_refused_without_writes() {
        let admin = admin_override();
        let account = AccountId::generate();
        let ctx = AdminContext {
            admin_id: "mallory".into(),
            is_admin: false,
        };

        assert!(matches!(
            admin.set_balance(&ctx, &account, 1000, "steal").await,
            Err(LedgerError::NotAuthorized(_))
        ));
        assert!(matches!(
            admin.grant(&ctx, &account, 1000, "steal").await,
            Err(LedgerError::NotAuthorized(_))
        ));
        assert!(matches!(
            admin.list_accounts(&ctx, 10, 0).await,
            Err(LedgerError::NotAuthorized(_))
        ));
        assert!(admin
            .list_accounts(&AdminContext::admin("root"), 10, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn records_carry_admin_id() {
        let admin = admin_override();
        let account = AccountId::generate();
        let ctx = AdminContext::admin("alice");

        let set = admin
            .set_balance(&ctx, &account, 200, "correction")
            .await
            .unwrap();
        assert_eq!(set.kind, TransactionKind::AdminSet);
        assert_eq!(set.amount, 150);
        assert_eq!(set.metadata.get_str(keys::ADMIN_ID), Some("alice"));

        let grant = admin.grant(&ctx, &account, 25, "goodwill").await.unwrap();
        assert_eq!(grant.kind, TransactionKind::AdminGrant);
        assert_eq!(grant.balance_after, 225);

        assert!(admin.audit(&ctx, &account).await.unwrap().is_consistent());
    }
}
