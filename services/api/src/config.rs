//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// HS256 signing key for access tokens.
    pub jwt_secret: String,
    /// Access token lifetime; a fixed 30-minute window by default.
    pub access_token_minutes: i64,
    /// Root directory attendance photos are written under and served from.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub openai_api_key: Option<String>,
    pub report_model: String,
    /// Per-attempt budget for the external AI capability.
    pub ai_timeout: Duration,
    /// Additional attempts after the first failure.
    pub ai_max_retries: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://goodhands.db?mode=rwc".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Auth Settings ---
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        let access_token_minutes = parse_var("ACCESS_TOKEN_MINUTES", 30)?;

        // --- Load Upload Settings ---
        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024_i64)? as usize;

        // --- Load AI Capability Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let report_model =
            std::env::var("REPORT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let ai_timeout = Duration::from_secs(parse_var("AI_TIMEOUT_SECS", 30)? as u64);
        let ai_max_retries = parse_var("AI_MAX_RETRIES", 2)? as u32;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            access_token_minutes,
            upload_dir,
            max_upload_bytes,
            openai_api_key,
            report_model,
            ai_timeout,
            ai_max_retries,
        })
    }
}

fn parse_var(name: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}
