//! Credit ledger service.
//!
//! This crate provides:
//!
//! - [`Ledger`] - the transactional API: initialize, consume, grant,
//!   admin set/grant, balance and history queries
//! - [`FeatureGate`] - check, act, then charge only on success
//! - [`AdminOverride`] - privileged corrections through the same ledger
//! - [`inference`] - the remote analysis collaborator
//! - the HTTP API ([`create_router`])
//!
//! # Authentication
//!
//! The HTTP API supports three authentication methods:
//!
//! 1. **HS256 JWT** - end-user requests; `sub` is the account UUID
//! 2. **Service API key** (`X-API-Key`) - feature backends charging usage
//! 3. **Admin API key** (`X-Admin-Key`, optional `X-Admin-Id`) - admin endpoints

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for the router

pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod inference;
pub mod ledger;
pub mod routes;
pub mod state;

pub use admin::{AdminContext, AdminOverride};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use gate::{FeatureGate, GateError, Gated, PricedFeature};
pub use inference::{AnalysisError, AnalysisKind, AnalysisReport, AnalysisRequest, Analyzer};
pub use ledger::{AuditReport, InitPolicy, Ledger};
pub use routes::create_router;
pub use state::AppState;
