//! Admin handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ledger_core::{AccountBalance, AccountId};

use super::{PageQuery, TransactionResponse};
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::ledger::AuditReport;
use crate::state::AppState;

fn parse_account(raw: &str) -> Result<AccountId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))
}

/// Account summary.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub account_id: String,
    /// Balance in credits.
    pub balance: i64,
    /// Mutations applied.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: String,
    /// Last change timestamp.
    pub updated_at: String,
}

impl From<&AccountBalance> for AccountResponse {
    fn from(account: &AccountBalance) -> Self {
        Self {
            account_id: account.account_id.to_string(),
            balance: account.balance,
            version: account.version,
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}

/// List accounts response.
#[derive(Debug, Serialize)]
pub struct ListAccountsResponse {
    /// Accounts, most recently created first.
    pub accounts: Vec<AccountResponse>,
    /// Whether there are more accounts.
    pub has_more: bool,
}

/// List all accounts and balances.
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListAccountsResponse>, ApiError> {
    let limit = query.clamped_limit();
    let accounts = state
        .admin
        .list_accounts(&admin.context(), limit + 1, query.offset)
        .await?;

    let has_more = accounts.len() > limit;
    let accounts = accounts
        .iter()
        .take(limit)
        .map(AccountResponse::from)
        .collect();

    Ok(Json(ListAccountsResponse { accounts, has_more }))
}

/// Set balance request.
#[derive(Debug, Deserialize)]
pub struct SetBalanceRequest {
    /// New absolute balance.
    pub balance: i64,
    /// Reason for the correction.
    pub reason: String,
}

/// Admin mutation response.
#[derive(Debug, Serialize)]
pub struct AdminMutationResponse {
    /// Balance after the change.
    pub balance: i64,
    /// The recorded transaction.
    pub transaction: TransactionResponse,
}

/// Set an account's balance to an absolute value.
pub async fn set_balance(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(account_id): Path<String>,
    Json(body): Json<SetBalanceRequest>,
) -> Result<Json<AdminMutationResponse>, ApiError> {
    let account_id = parse_account(&account_id)?;
    let record = state
        .admin
        .set_balance(&admin.context(), &account_id, body.balance, &body.reason)
        .await?;

    Ok(Json(AdminMutationResponse {
        balance: record.balance_after,
        transaction: TransactionResponse::from(&record),
    }))
}

/// Grant request.
#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    /// Credits to add.
    pub amount: i64,
    /// Reason for the grant.
    pub reason: String,
}

/// Grant credits to an account.
pub async fn grant(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(account_id): Path<String>,
    Json(body): Json<GrantRequest>,
) -> Result<Json<AdminMutationResponse>, ApiError> {
    let account_id = parse_account(&account_id)?;
    let record = state
        .admin
        .grant(&admin.context(), &account_id, body.amount, &body.reason)
        .await?;

    Ok(Json(AdminMutationResponse {
        balance: record.balance_after,
        transaction: TransactionResponse::from(&record),
    }))
}

/// Audit response.
#[derive(Debug, Serialize)]
pub struct AuditResponse {
    /// Whether the log replays to the stored balance.
    pub consistent: bool,
    /// Details.
    #[serde(flatten)]
    pub report: AuditReport,
}

/// Replay an account's log against its balance.
pub async fn audit(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(account_id): Path<String>,
) -> Result<Json<AuditResponse>, ApiError> {
    let account_id = parse_account(&account_id)?;
    let report = state.admin.audit(&admin.context(), &account_id).await?;

    Ok(Json(AuditResponse {
        consistent: report.is_consistent(),
        report,
    }))
}
