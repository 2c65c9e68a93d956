//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its
//! conversion into the uniform client-facing error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::Serialize;
use tracing::error;

use crate::config::ConfigError;
use goodhands_core::ports::PortError;
use goodhands_core::ChecklistError;

/// The primary error type for the `api` service.
///
/// Every business-rule violation is recovered at this boundary into the
/// uniform envelope; no internal detail leaks to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input (422).
    #[error("{0}")]
    Validation(String),

    /// Missing, expired or malformed credential (401).
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated but not entitled (403).
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// State or uniqueness violation (409).
    #[error("{0}")]
    Conflict(String),

    /// Operation not valid for the entity's current lifecycle state (400).
    #[error("{0}")]
    InvalidState(String),

    /// The external AI capability failed after bounded retries (502).
    #[error("{0}")]
    Upstream(String),

    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<PortError> for ApiError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(msg) => ApiError::NotFound(msg),
            PortError::Conflict(msg) => ApiError::Conflict(msg),
            PortError::InvalidState(msg) => ApiError::InvalidState(msg),
            PortError::Upstream(msg) => ApiError::Upstream(msg),
            PortError::Unexpected(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ChecklistError> for ApiError {
    fn from(e: ChecklistError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

/// The uniform error envelope every non-2xx response carries.
#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
    pub message: String,
    pub status_code: u16,
    pub timestamp: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::InvalidState(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// The message shown to the client. Internal error classes are replaced
    /// with a generic line; the real cause only goes to the log.
    fn client_message(&self) -> String {
        match self {
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("internal error: {:?}", self);
        }
        let envelope = ErrorEnvelope {
            error: code,
            message: self.client_message(),
            status_code: status.as_u16(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(envelope)).into_response()
    }
}
