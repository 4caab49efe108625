//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, analyses, credits, health, usage};
use crate::state::AppState;

/// Maximum concurrent analyses. Each holds an inference call open.
const ANALYSIS_MAX_CONCURRENT_REQUESTS: usize = 32;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Credits (user JWT auth)
/// - `GET /v1/credits/balance` - Current balance
/// - `GET /v1/credits/transactions` - Transaction history
/// - `POST /v1/credits/initialize` - Welcome grant (idempotent)
/// - `POST /v1/credits/purchase` - Grant a purchased pack
/// - `GET /v1/credits/packs` - Pack catalog
///
/// ## Analyses (user JWT auth, own timeout and concurrency limit)
/// - `POST /v1/analyses` - Run a priced analysis
///
/// ## Usage (service API key auth)
/// - `POST /v1/usage/consume` - Charge credits
///
/// ## Admin (admin API key auth)
/// - `GET /v1/admin/accounts` - List balances
/// - `POST /v1/admin/accounts/:id/balance` - Set absolute balance
/// - `POST /v1/admin/accounts/:id/grant` - Grant credits
/// - `GET /v1/admin/accounts/:id/audit` - Replay the log
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = Duration::from_secs(state.config.request_timeout_seconds);
    let analysis_timeout = Duration::from_secs(state.config.analysis_timeout_seconds);

    let state = Arc::new(state);

    // Analyses wait on inference and carry their own timeout
    let analysis_routes = Router::new()
        .route("/v1/analyses", post(analyses::analyze))
        .layer(TimeoutLayer::new(analysis_timeout))
        .layer(ConcurrencyLimitLayer::new(ANALYSIS_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Credits
        .route("/v1/credits/balance", get(credits::get_balance))
        .route("/v1/credits/transactions", get(credits::list_transactions))
        .route("/v1/credits/initialize", post(credits::initialize))
        .route("/v1/credits/purchase", post(credits::purchase))
        .route("/v1/credits/packs", get(credits::list_packs))
        // Usage (service auth)
        .route("/v1/usage/consume", post(usage::consume))
        // Admin
        .route("/v1/admin/accounts", get(admin::list_accounts))
        .route("/v1/admin/accounts/:id/balance", post(admin::set_balance))
        .route("/v1/admin/accounts/:id/grant", post(admin::grant))
        .route("/v1/admin/accounts/:id/audit", get(admin::audit))
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .merge(api_routes)
        .merge(analysis_routes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
