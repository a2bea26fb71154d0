use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::domains::providers::registration::RetryPolicy;
use crate::domains::providers::DEFAULT_SESSION_IDLE_TIMEOUT;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
    pub storage_bucket: String,
    /// When set, profile and prescreening rows go straight to Postgres
    /// instead of through the REST API.
    pub database_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub vapi_api_key: Option<String>,
    pub vapi_assistant_id: Option<String>,
    pub vapi_base_url: String,
    pub registration_max_retries: u32,
    pub registration_retry_backoff: Duration,
    pub preferences_path: PathBuf,
    pub session_idle_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            supabase_url: env::var("SUPABASE_URL").context("SUPABASE_URL must be set")?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .context("SUPABASE_ANON_KEY must be set")?,
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
            storage_bucket: env::var("SUPABASE_STORAGE_BUCKET")
                .unwrap_or_else(|_| "provider-documents".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            allowed_origins: parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            vapi_api_key: env::var("VAPI_API_KEY").ok(),
            vapi_assistant_id: env::var("VAPI_ASSISTANT_ID").ok(),
            vapi_base_url: env::var("VAPI_BASE_URL")
                .unwrap_or_else(|_| "https://api.vapi.ai".to_string()),
            registration_max_retries: env::var("REGISTRATION_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("REGISTRATION_MAX_RETRIES must be a valid number")?,
            registration_retry_backoff: Duration::from_millis(
                env::var("REGISTRATION_RETRY_BACKOFF_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .context("REGISTRATION_RETRY_BACKOFF_MS must be a valid number")?,
            ),
            preferences_path: env::var("PREFERENCES_PATH")
                .unwrap_or_else(|_| "preferences.json".to_string())
                .into(),
            session_idle_timeout: match env::var("SESSION_IDLE_TIMEOUT_SECS") {
                Ok(secs) => Duration::from_secs(
                    secs.parse()
                        .context("SESSION_IDLE_TIMEOUT_SECS must be a valid number")?,
                ),
                Err(_) => DEFAULT_SESSION_IDLE_TIMEOUT,
            },
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.registration_max_retries, self.registration_retry_backoff)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
