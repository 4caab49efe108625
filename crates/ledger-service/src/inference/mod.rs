//! Remote inference collaborator.
//!
//! The analysis content is produced by a third-party model API and is opaque to
//! the ledger. Feature endpoints run an [`Analyzer`] inside the
//! [`FeatureGate`](crate::gate::FeatureGate), so a failed analysis is never
//! charged.

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::OpenRouterAnalyzer;
pub use types::{AnalysisKind, AnalysisReport, AnalysisRequest};

/// Error type for inference operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned an error status (after any fallback).
    #[error("inference API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The provider answered with something that is not a completion.
    #[error("invalid inference response: {0}")]
    InvalidResponse(String),
}

/// Produces analysis reports.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Run one analysis.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError>;
}
