//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
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
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    /// Access token lifetime in seconds. Short by design: expiry forces a
    /// round-trip through `/auth/refresh`, which re-reads the user's roles.
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds. The refresh cookie's Max-Age is
    /// derived from this same value so cookie and token can never disagree.
    pub refresh_token_ttl_secs: i64,
    pub allowed_origins: Vec<String>,
    pub log_dir: PathBuf,
    pub public_dir: PathBuf,
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
        let port_str = std::env::var("PORT").unwrap_or_else(|_| "3500".to_string());
        let port = port_str
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?;
        let bind_address = SocketAddr::from(([0, 0, 0, 0], port));

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Token Settings ---
        let access_token_secret = std::env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingVar("ACCESS_TOKEN_SECRET".to_string()))?;
        let refresh_token_secret = std::env::var("REFRESH_TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingVar("REFRESH_TOKEN_SECRET".to_string()))?;

        let access_token_ttl_secs = var_i64("ACCESS_TOKEN_TTL_SECS", 900)?;
        let refresh_token_ttl_secs = var_i64("REFRESH_TOKEN_TTL_SECS", 86_400)?;

        // --- Load CORS, Logging and Static Settings ---
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_dir = std::env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./logs"));

        let public_dir = std::env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public"));

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            allowed_origins,
            log_dir,
            public_dir,
        })
    }
}

fn var_i64(name: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
