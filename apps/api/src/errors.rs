use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Assembly, export or correction attempted against a role without complete content.
    #[error("Incomplete content: {0}")]
    IncompleteContent(String),

    #[error("Generation already in flight for role {role_id}")]
    ConcurrentGenerationRejected { role_id: Uuid },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code used in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::IncompleteContent(_) => "INCOMPLETE_CONTENT",
            AppError::ConcurrentGenerationRejected { .. } => "CONCURRENT_GENERATION_REJECTED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::GenerationFailure(_) => "GENERATION_FAILURE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::IncompleteContent(msg) | AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, msg.clone())
            }
            AppError::ConcurrentGenerationRejected { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::GenerationFailure(msg) => {
                tracing::warn!("Generation failure surfaced to caller: {msg}");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
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
