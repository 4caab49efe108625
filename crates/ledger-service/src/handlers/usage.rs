//! Usage handlers for feature backends.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use ledger_core::metadata::keys;
use ledger_core::{AccountId, Metadata};

use super::TransactionResponse;
use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Consume request from services.
#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    /// Account being charged.
    pub account_id: String,
    /// Credits to consume.
    pub amount: i64,
    /// Reason recorded on the transaction.
    pub reason: String,
    /// Additional metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

/// Consume response.
#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    /// Balance after the debit.
    pub balance: i64,
    /// The CONSUME record.
    pub transaction: TransactionResponse,
}

/// Charge credits on behalf of a feature backend.
pub async fn consume(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(body): Json<ConsumeRequest>,
) -> Result<Json<ConsumeResponse>, ApiError> {
    let account_id: AccountId = body
        .account_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))?;

    let metadata = body
        .metadata
        .with(keys::SOURCE, service.service_name.as_str());

    let record = state
        .ledger
        .consume(&account_id, body.amount, &body.reason, metadata)
        .await?;

    Ok(Json(ConsumeResponse {
        balance: record.balance_after,
        transaction: TransactionResponse::from(&record),
    }))
}
