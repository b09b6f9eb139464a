pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::feedback::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Feedback sessions
        .route(
            "/api/v1/feedback/sessions",
            post(handlers::handle_start_session),
        )
        .route(
            "/api/v1/feedback/sessions/:user_id",
            get(handlers::handle_session_status),
        )
        .route(
            "/api/v1/feedback/sessions/:user_id/messages",
            post(handlers::handle_session_message),
        )
        .route(
            "/api/v1/feedback/sessions/:user_id/evaluate",
            post(handlers::handle_evaluate),
        )
        // Read side
        .route(
            "/api/v1/evaluations/users/:user_id",
            get(handlers::handle_user_profile),
        )
        .route(
            "/api/v1/evaluations/company",
            get(handlers::handle_company_profile),
        )
        .route(
            "/api/v1/evaluations/feedback/:feedback_id",
            get(handlers::handle_feedback_evaluations),
        )
        .with_state(state)
}
