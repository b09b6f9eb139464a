use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::aggregate::EvaluationProfile;
use crate::feedback::service::{EvaluationSummary, SessionReply, SessionStatus};
use crate::models::evaluation::EvaluationRecord;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// POST /api/v1/feedback/sessions
pub async fn handle_start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionReply>), AppError> {
    let reply = state.feedback.initiate_for(req.user_id).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

/// GET /api/v1/feedback/sessions/:user_id
pub async fn handle_session_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<SessionStatus> {
    let open = state.feedback.session_open(user_id).await;
    Json(SessionStatus { user_id, open })
}

/// POST /api/v1/feedback/sessions/:user_id/messages
pub async fn handle_session_message(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<SessionReply>, AppError> {
    let reply = state.feedback.continue_feedback(user_id, &req.text).await?;
    Ok(Json(reply))
}

/// POST /api/v1/feedback/sessions/:user_id/evaluate
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<EvaluationSummary>, AppError> {
    let summary = state.feedback.evaluate(user_id).await?;
    Ok(Json(summary))
}

/// GET /api/v1/evaluations/users/:user_id
pub async fn handle_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<EvaluationProfile>, AppError> {
    Ok(Json(state.feedback.profile_for_user(user_id).await?))
}

/// GET /api/v1/evaluations/company
pub async fn handle_company_profile(
    State(state): State<AppState>,
) -> Result<Json<EvaluationProfile>, AppError> {
    Ok(Json(state.feedback.company_profile().await?))
}

/// GET /api/v1/evaluations/feedback/:feedback_id
pub async fn handle_feedback_evaluations(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
) -> Result<Json<Vec<EvaluationRecord>>, AppError> {
    Ok(Json(state.feedback.evaluations_for_feedback(feedback_id).await?))
}
