//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Store Errors**: the durable store or its codec failed (`Database`,
///   `Storage`, `MalformedRecord`). These are fatal to the request only.
/// - **Lookup Errors**: a user or key does not exist
/// - **Validation Errors**: a malformed origin list or request body
/// - **Authorization Errors**: missing identity, ownership mismatch, missing admin privilege
/// - **State Errors**: the key is not in a state that allows the operation
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The blob store could not complete a read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored record could not be decoded (or a record could not be encoded).
    #[error("Malformed record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    /// Requested user or key does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0}")]
    NotFound(String),

    /// Request data failed validation. Nothing was written.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    ValidationFailed(String),

    /// The caller does not own the resource or is not an admin.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    Forbidden(String),

    /// The resource is in a state that does not allow the operation.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    PreconditionFailed(String),

    /// No authenticated identity was attached to the request.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Authentication required")]
    Unauthenticated,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Store failures return 500 with a generic message; their details only go
/// to the log.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::ValidationFailed(ref msg) => {
                (StatusCode::BAD_REQUEST, "validation_failed", msg.clone())
            }
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::PreconditionFailed(ref msg) => {
                (StatusCode::CONFLICT, "precondition_failed", msg.clone())
            }
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                self.to_string(),
            ),
            AppError::Database(_) | AppError::Storage(_) | AppError::MalformedRecord(_) => {
                tracing::error!(error = %self, "Store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
