use std::sync::Arc;

use crate::feedback::service::FeedbackService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the session store, the gateway and the extractor.
    pub feedback: Arc<FeedbackService>,
}
