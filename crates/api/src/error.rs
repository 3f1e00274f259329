//! Error types for the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::DatabaseError;
use object_storage::StorageError;
use thiserror::Error;

/// Errors that can occur while handling a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Object storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Missing, expired or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Database(err) => database_status(err),
            ApiError::Storage(err) => {
                tracing::error!(class = err.class(), "Storage error: {}", err);
                match err {
                    StorageError::Init { .. } => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "File storage is not available".to_string(),
                    ),
                    _ => (
                        StatusCode::BAD_GATEWAY,
                        "File storage operation failed".to_string(),
                    ),
                }
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

fn database_status(err: &DatabaseError) -> (StatusCode, String) {
    match err {
        DatabaseError::NotFound { entity, .. } => {
            (StatusCode::NOT_FOUND, format!("{} not found", entity))
        }
        DatabaseError::AlreadyExists { .. }
        | DatabaseError::InUse { .. }
        | DatabaseError::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        DatabaseError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        DatabaseError::Sqlx(_) | DatabaseError::Migration(_) => {
            tracing::error!("Database error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Result type for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
