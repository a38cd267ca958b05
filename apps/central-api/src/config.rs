//! Central API configuration module.
//!
//! Server settings come from environment variables with fallback to
//! defaults. Sync settings are the shared [`SyncConfig`], loaded from
//! `LEDGERLINK_CONFIG` (or the platform default path) plus its own
//! `LEDGERLINK_*` overrides.

use std::path::PathBuf;

use ledger_sync::{SyncConfig, SyncError};

/// Central API configuration.
#[derive(Debug, Clone)]
pub struct CentralConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Scheduler and terminal settings
    pub sync: SyncConfig,
}

impl CentralConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`CentralConfig::load`] with an injectable variable lookup.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let http_port = parse_or(&lookup, "HTTP_PORT", 3000)?;

        let database_path = lookup("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("ledgerlink.db"));

        // In production, this MUST be set via environment variable
        let jwt_secret = lookup("JWT_SECRET")
            .unwrap_or_else(|| "ledgerlink-dev-secret-change-in-production".to_string());
        if jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }

        let jwt_access_lifetime_secs: i64 = parse_or(&lookup, "JWT_ACCESS_LIFETIME_SECS", 3600)?;
        if jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "JWT_ACCESS_LIFETIME_SECS".to_string(),
            ));
        }

        let sync = SyncConfig::load(lookup("LEDGERLINK_CONFIG").map(PathBuf::from))?;

        Ok(CentralConfig {
            http_port,
            database_path,
            jwt_secret,
            jwt_access_lifetime_secs,
            sync,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Sync configuration: {0}")]
    Sync(#[from] SyncError),
}
