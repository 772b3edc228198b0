//! Error types for the offline core
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Offline Error Enum ==
/// Unified error type for the offline core and its HTTP surface.
#[derive(Error, Debug)]
pub enum OfflineError {
    /// Requested resource is absent (missing, expired or no alternative)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The persistence substrate rejected a read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// An action was accepted in memory but could not be persisted
    #[error("Action {id} queued but not persisted: {reason}")]
    NotDurable { id: String, reason: String },

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The host lacks a required capability (e.g. speech recognition)
    #[error("Unsupported capability: {0}")]
    Unsupported(String),

    /// Operation did not complete within its time budget
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for OfflineError {
    fn from(err: std::io::Error) -> Self {
        OfflineError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for OfflineError {
    fn into_response(self) -> Response {
        let status = match &self {
            OfflineError::NotFound(_) => StatusCode::NOT_FOUND,
            OfflineError::InvalidRequest(_) | OfflineError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            OfflineError::Storage(_) | OfflineError::NotDurable { .. } => {
                StatusCode::INSUFFICIENT_STORAGE
            }
            OfflineError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            OfflineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            OfflineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the offline core.
pub type Result<T> = std::result::Result<T, OfflineError>;
