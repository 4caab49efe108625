//! Application state.

use std::sync::Arc;

use ledger_store::Store;

use crate::admin::AdminOverride;
use crate::config::ServiceConfig;
use crate::gate::FeatureGate;
use crate::inference::{Analyzer, OpenRouterAnalyzer};
use crate::ledger::Ledger;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The ledger service.
    pub ledger: Arc<Ledger>,

    /// Gate for priced features.
    pub gate: FeatureGate,

    /// Admin operations.
    pub admin: AdminOverride,

    /// Inference collaborator (optional).
    pub analyzer: Option<Arc<dyn Analyzer>>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let ledger = Arc::new(Ledger::new(store, config.init_policy()));
        tracing::info!(policy = ?ledger.policy(), "Ledger ready");

        let analyzer = config.openrouter_api_key.as_ref().and_then(|key| {
            match OpenRouterAnalyzer::new(
                &config.openrouter_url,
                key,
                &config.primary_model,
                &config.fallback_model,
            ) {
                Ok(analyzer) => {
                    tracing::info!(model = %config.primary_model, "Inference integration enabled");
                    Some(Arc::new(analyzer) as Arc<dyn Analyzer>)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build inference client");
                    None
                }
            }
        });

        if analyzer.is_none() {
            tracing::warn!("Inference not configured - analyses will not be available");
        }

        Self {
            gate: FeatureGate::new(Arc::clone(&ledger)),
            admin: AdminOverride::new(Arc::clone(&ledger)),
            ledger,
            analyzer,
            config,
        }
    }

    /// Replace the inference collaborator.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }
}
