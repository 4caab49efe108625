//! Credit balance, history and purchase handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ledger_core::{find_pack, CreditPack};

use super::{PageQuery, TransactionResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Account the balance belongs to.
    pub account_id: String,
    /// Balance in credits.
    pub balance: i64,
}

/// Get current credit balance.
///
/// Under the default policy this initializes an unseen account.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.ledger.balance_of(&auth.account_id).await?;

    Ok(Json(BalanceResponse {
        account_id: auth.account_id.to_string(),
        balance,
    }))
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.clamped_limit();
    let transactions = state
        .ledger
        .history_page(&auth.account_id, limit + 1, query.offset)
        .await?;

    let has_more = transactions.len() > limit;
    let transactions = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Initialize response.
#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    /// Balance after the call.
    pub balance: i64,
    /// Whether this call created the account.
    pub created: bool,
    /// The INITIALIZE record, when created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionResponse>,
}

/// Initialize the caller's account with the welcome grant. Idempotent.
pub async fn initialize(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<InitializeResponse>, ApiError> {
    let init = state
        .ledger
        .initialize(&auth.account_id, state.config.initial_credits)
        .await?;

    Ok(Json(InitializeResponse {
        balance: init.account.balance,
        created: init.created(),
        transaction: init.record.as_ref().map(TransactionResponse::from),
    }))
}

/// List packs response.
#[derive(Debug, Serialize)]
pub struct ListPacksResponse {
    /// Available packs.
    pub packs: Vec<CreditPack>,
}

/// List purchasable credit packs.
pub async fn list_packs(State(state): State<Arc<AppState>>) -> Json<ListPacksResponse> {
    Json(ListPacksResponse {
        packs: state.config.packs.clone(),
    })
}

/// Purchase request.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Pack to buy.
    pub pack_id: String,
}

/// Purchase response.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// Balance after the grant.
    pub balance: i64,
    /// The purchased pack.
    pub pack: CreditPack,
    /// The GRANT record.
    pub transaction: TransactionResponse,
}

/// Complete a (simulated) purchase by granting the pack's credits.
pub async fn purchase(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let pack = find_pack(&state.config.packs, &body.pack_id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown credit pack: {}", body.pack_id)))?
        .clone();

    let record = state.ledger.purchase(&auth.account_id, &pack).await?;

    Ok(Json(PurchaseResponse {
        balance: record.balance_after,
        pack,
        transaction: TransactionResponse::from(&record),
    }))
}
