use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::feedback::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("A feedback session is already open for user {0}")]
    AlreadyOpen(Uuid),

    #[error("No open feedback session for user {0}")]
    NoOpenSession(Uuid),

    #[error("Target user not found: {0}")]
    TargetNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Extraction produced no valid evaluations for feedback {feedback_id}")]
    NoEvaluationsProduced { feedback_id: Uuid, dropped: usize },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::AlreadyOpen(user_id) => AppError::AlreadyOpen(user_id),
            SessionError::NoOpenSession(user_id) => AppError::NoOpenSession(user_id),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::AlreadyOpen(_) => (
                StatusCode::CONFLICT,
                "SESSION_ALREADY_OPEN",
                "A feedback session is already open. Evaluate it before starting a new one."
                    .to_string(),
            ),
            AppError::NoOpenSession(_) => (
                StatusCode::NOT_FOUND,
                "NO_OPEN_SESSION",
                "Your feedback session has been closed or has expired. Start a new session to continue."
                    .to_string(),
            ),
            AppError::TargetNotFound(msg) => {
                (StatusCode::NOT_FOUND, "TARGET_NOT_FOUND", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NoEvaluationsProduced { dropped, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_EVALUATIONS_PRODUCED",
                format!(
                    "No usable evaluation could be extracted ({dropped} candidate(s) rejected). \
                     Your feedback was kept; evaluate again to retry."
                ),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
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
