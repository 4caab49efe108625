//! Priced analysis endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::gate::PricedFeature;
use crate::inference::{AnalysisKind, AnalysisReport, AnalysisRequest};
use crate::state::AppState;

/// Analysis request body.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Which analysis to run.
    pub kind: AnalysisKind,
    /// Input for the analysis.
    #[serde(default)]
    pub input: serde_json::Value,
}

/// Analysis response.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// The report.
    pub report: AnalysisReport,
    /// Credits charged.
    pub credits_charged: i64,
    /// Balance after the charge.
    pub balance: i64,
    /// The CONSUME record's ID.
    pub transaction_id: String,
}

/// Run an analysis through the feature gate.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let analyzer = state
        .analyzer
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("Inference not configured".into()))?;

    let feature = PricedFeature::new(body.kind.feature_name(), state.config.analysis_cost);
    let request = AnalysisRequest {
        kind: body.kind,
        input: body.input,
    };

    let gated = state
        .gate
        .run(&auth.account_id, &feature, || analyzer.analyze(&request))
        .await?;

    tracing::info!(
        account_id = %auth.account_id,
        kind = %request.kind,
        model = %gated.output.model,
        balance = gated.record.balance_after,
        "Analysis completed"
    );

    Ok(Json(AnalyzeResponse {
        credits_charged: -gated.record.amount,
        balance: gated.record.balance_after,
        transaction_id: gated.record.id.to_string(),
        report: gated.output,
    }))
}
