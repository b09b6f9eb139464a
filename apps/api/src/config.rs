use anyhow::{bail, Context, Result};
use chrono::Duration;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Shown in session prompts and handed to the extractor as the company subject.
    pub company_name: String,
    /// A session not advanced within this window is dropped on next access.
    pub session_ttl: Duration,
    /// An uncalculated feedback record older than this is never reused.
    pub feedback_dedup_window: Duration,
    pub session_sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            company_name: std::env::var("COMPANY_NAME")
                .unwrap_or_else(|_| "Anything Forward".to_string()),
            session_ttl: hours_env("SESSION_TTL_HOURS", 48)?,
            feedback_dedup_window: hours_env("FEEDBACK_DEDUP_WINDOW_HOURS", 48)?,
            session_sweep_interval_secs: positive_env("SESSION_SWEEP_INTERVAL_SECS", 300)? as u64,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn positive_env(key: &str, default: i64) -> Result<i64> {
    let value = match std::env::var(key) {
        Ok(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("{key} must be an integer"))?,
        Err(_) => default,
    };
    if value <= 0 {
        bail!("{key} must be positive, got {value}");
    }
    Ok(value)
}

fn hours_env(key: &str, default: i64) -> Result<Duration> {
    let hours = positive_env(key, default)?;
    Duration::try_hours(hours).with_context(|| format!("{key} is too large: {hours} hours"))
}
