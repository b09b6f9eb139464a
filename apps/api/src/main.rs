mod config;
mod db;
mod errors;
mod feedback;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::feedback::extraction::LlmExtractor;
use crate::feedback::gateway::PgGateway;
use crate::feedback::service::{FeedbackService, ServiceSettings};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Wevo API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;
    let gateway = Arc::new(PgGateway::new(db));

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let extractor = Arc::new(LlmExtractor::new(llm));

    let feedback = Arc::new(FeedbackService::new(
        gateway,
        extractor,
        ServiceSettings {
            company_name: config.company_name.clone(),
            session_ttl: config.session_ttl,
            feedback_dedup_window: config.feedback_dedup_window,
        },
    ));
    info!(
        "Feedback service ready (session ttl {}h, dedup window {}h)",
        config.session_ttl.num_hours(),
        config.feedback_dedup_window.num_hours()
    );

    spawn_session_sweeper(
        feedback.clone(),
        Duration::from_secs(config.session_sweep_interval_secs),
    );

    let state = AppState { feedback };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Drops expired sessions in the background. Expiry is also enforced on access, so a
/// missed tick only delays freeing memory.
fn spawn_session_sweeper(feedback: Arc<FeedbackService>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = feedback.sweep_expired_sessions().await;
            if removed > 0 {
                info!("Swept {removed} expired feedback session(s)");
            } else {
                debug!("Session sweep found nothing to remove");
            }
        }
    });
}
