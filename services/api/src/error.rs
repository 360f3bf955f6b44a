//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto HTTP responses. Every handler failure is produced at the point of
//! detection and converted directly into a status code plus a JSON
//! `{"message": ...}` body; nothing is retried.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use technotes_core::ports::PortError;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A missing or malformed request field. Always a 400.
    #[error("{0}")]
    Validation(String),

    /// Missing credential, unknown user, wrong password or inactive account.
    /// Deliberately carries no detail so callers cannot enumerate accounts.
    #[error("Unauthorized")]
    Unauthorized,

    /// A credential was presented but is cryptographically invalid or expired.
    #[error("Forbidden")]
    Forbidden,

    /// A uniqueness constraint violation on a user-supplied field. 409.
    #[error("{0}")]
    Conflict(String),

    /// A referenced record is absent. Surfaced as a flat 400, not a routing
    /// 404 (404 is reserved for unmatched paths).
    #[error("{0}")]
    NotFound(String),

    /// A write was rejected by the store. Generic 400.
    #[error("{0}")]
    Storage(String),

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
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => ApiError::NotFound(msg),
            PortError::Conflict(msg) => ApiError::Conflict(msg),
            PortError::Unexpected(msg) => ApiError::Internal(msg),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::NotFound(_) | ApiError::Storage(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Log the real cause, return a generic body.
            error!("internal error: {self}");
            return (
                status,
                Json(json!({ "message": "Internal Server Error" })),
            )
                .into_response();
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            ApiError::Validation("All fields are required".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_is_a_flat_400() {
        assert_eq!(
            ApiError::NotFound("No users found".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(
            ApiError::Conflict("Duplicate username".into()).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn port_conflict_converts_to_conflict() {
        let err: ApiError = PortError::Conflict("duplicate key".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unexpected_port_error_is_internal() {
        let err: ApiError = PortError::Unexpected("boom".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
