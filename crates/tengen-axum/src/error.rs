//! HTTP error types and mappings.
//!
//! Maps [`EngineError`] onto HTTP status codes. A dead or unstartable
//! engine is a 503 so load balancers treat the instance as unhealthy
//! rather than broken.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use tengen_core::error::EngineError;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflict (e.g. a correlation id already in flight).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Service unavailable (engine dead or failed to start).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<EngineError> for HttpError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Spawn { .. } | EngineError::Terminated { .. } => {
                Self::ServiceUnavailable(err.to_string())
            }
            EngineError::Protocol { .. } => Self::Conflict(err.to_string()),
            EngineError::Io { .. } => Self::Internal(err.to_string()),
        }
    }
}
