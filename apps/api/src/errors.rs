use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed required input. `missing_questions` carries the
    /// question texts when the failure comes from intake validation.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        missing_questions: Vec<String>,
    },

    /// A lifecycle stage was requested out of order.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream text-generation or extraction service failure.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Rendering of the final document failed.
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            missing_questions: Vec::new(),
        }
    }

    /// Stable machine-readable kind carried by every error response.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Precondition(_) => "PRECONDITION_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Generation(_) => "GENERATION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::Precondition(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Generation(_)
            | AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::ExternalService(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        // Client-caused errors echo their message; upstream and server-side
        // causes are logged and replaced by a fixed message.
        let message = match &self {
            AppError::Validation { message, .. } => message.clone(),
            AppError::Precondition(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::ExternalService(msg) => {
                tracing::error!("External service error: {msg}");
                "An upstream AI or extraction service failed".to_string()
            }
            AppError::Generation(msg) => {
                tracing::error!("Document rendering error: {msg}");
                "The final document could not be rendered; retry finalize".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "A database error occurred".to_string()
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                "A storage error occurred".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let mut error = json!({
            "kind": kind,
            "message": message,
        });
        if let AppError::Validation {
            missing_questions, ..
        } = &self
        {
            if !missing_questions.is_empty() {
                error["missing_questions"] = json!(missing_questions);
            }
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
