//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use ledger_core::LedgerError;

use crate::gate::GateError;
use crate::inference::AnalysisError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Insufficient credits.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// The feature ran but could not be charged.
    #[error("consume failed: {message}")]
    ConsumeFailed {
        /// Invocation to reconcile.
        invocation_id: String,
        /// Underlying ledger failure.
        message: String,
    },

    /// The ledger store is unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                LedgerError::InsufficientCredits {
                    balance: *balance,
                    required: *required,
                }
                .user_message(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::ConsumeFailed {
                invocation_id,
                message,
            } => (
                StatusCode::CONFLICT,
                "consume_failed",
                format!("The operation completed but could not be charged: {message}"),
                Some(serde_json::json!({ "invocation_id": invocation_id })),
            ),
            Self::Unavailable(msg) => {
                tracing::error!(error = %msg, "Ledger store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "The credit system is temporarily unavailable".to_string(),
                    None,
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound { account_id } => {
                Self::NotFound(format!("account not found: {account_id}"))
            }
            LedgerError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            LedgerError::InvalidAmount(msg) => Self::BadRequest(msg),
            LedgerError::InvalidId(e) => Self::BadRequest(e.to_string()),
            LedgerError::NotAuthorized(_) => Self::Forbidden,
            LedgerError::StoreUnavailable(msg) => Self::Unavailable(msg),
            LedgerError::Corrupted(msg) => Self::Internal(msg),
        }
    }
}

impl From<GateError<AnalysisError>> for ApiError {
    fn from(err: GateError<AnalysisError>) -> Self {
        match err {
            GateError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            GateError::ExecutionFailed(e) => {
                tracing::error!(error = %e, "Analysis failed");
                Self::ExternalService(
                    "The analysis service is currently unavailable. No credits were charged."
                        .into(),
                )
            }
            GateError::ConsumeFailed {
                invocation_id,
                cause,
            } => Self::ConsumeFailed {
                invocation_id,
                message: cause.to_string(),
            },
            GateError::Ledger(e) => e.into(),
        }
    }
}
