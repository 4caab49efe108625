//! Credit ledger service - HTTP API for credits and priced analyses.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_service::{create_router, AppState, ServiceConfig};
use ledger_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting credit ledger service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        postgres_configured = %config.database_url.is_some(),
        auto_initialize = %config.auto_initialize,
        initial_credits = %config.initial_credits,
        analysis_cost = %config.analysis_cost,
        inference_configured = %config.openrouter_api_key.is_some(),
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Pick the storage backend from the configuration.
async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    if let Some(url) = &config.database_url {
        tracing::info!("Connecting to PostgreSQL");
        return Ok(Arc::new(PgStore::connect(url).await?));
    }

    #[cfg(feature = "rocksdb-backend")]
    if let Some(dir) = &config.data_dir {
        tracing::info!(path = %dir, "Opening RocksDB store");
        return Ok(Arc::new(ledger_store::RocksStore::open(dir)?));
    }

    tracing::warn!("DATABASE_URL not set - using the in-memory store, balances will not survive a restart");
    Ok(Arc::new(MemoryStore::new()))
}
