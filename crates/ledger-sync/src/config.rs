//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     LEDGERLINK_SYNC_INTERVAL_SECS=60                                   │
//! │     LEDGERLINK_TERMINAL_URL=http://192.168.1.20:9000                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/ledgerlink/sync.toml (Linux)                             │
//! │     ~/Library/Application Support/com.ledgerlink.ledgerlink/sync.toml │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [scheduler]
//! interval_secs = 60
//! order_batch_limit = 50
//! price_level_batch_limit = 20
//! enabled = true
//!
//! [terminal]
//! request_timeout_secs = 10
//! default_sales_ledger = "Sales"
//! url = "http://localhost:9000"      # bridge agent only
//!
//! [bridge]
//! central_url = "http://localhost:3000"
//! username = "operator"
//! password = "secret"
//! catalog_import = true
//! request_timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use ledger_core::{TenantEndpoint, DEFAULT_ORDER_BATCH, DEFAULT_PRICE_LEVEL_BATCH, DEFAULT_SALES_LEDGER};

// =============================================================================
// Scheduler Settings
// =============================================================================

/// How often a cycle runs and how much it picks up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Seconds between cycle starts. Default: 60
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Orders discovered per cycle. Default: 50
    #[serde(default = "default_order_batch")]
    pub order_batch_limit: u32,

    /// Price levels discovered per cycle. Default: 20
    #[serde(default = "default_price_level_batch")]
    pub price_level_batch_limit: u32,

    /// Whether the central service runs the scheduler at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_interval() -> u64 {
    60
}

fn default_order_batch() -> u32 {
    DEFAULT_ORDER_BATCH
}

fn default_price_level_batch() -> u32 {
    DEFAULT_PRICE_LEVEL_BATCH
}

fn default_true() -> bool {
    true
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings {
            interval_secs: default_interval(),
            order_batch_limit: default_order_batch(),
            price_level_batch_limit: default_price_level_batch(),
            enabled: true,
        }
    }
}

impl SchedulerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// =============================================================================
// Terminal Settings
// =============================================================================

/// How ERP terminals are talked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSettings {
    /// Per-request timeout. Default: 10
    #[serde(default = "default_terminal_timeout")]
    pub request_timeout_secs: u64,

    /// Ledger used when neither the tenant nor its parent names one.
    #[serde(default = "default_sales_ledger")]
    pub default_sales_ledger: String,

    /// Locally reachable terminal. Only the bridge agent reads this.
    #[serde(default = "default_terminal_url")]
    pub url: String,
}

fn default_terminal_timeout() -> u64 {
    10
}

fn default_sales_ledger() -> String {
    DEFAULT_SALES_LEDGER.to_string()
}

fn default_terminal_url() -> String {
    "http://localhost:9000".to_string()
}

impl Default for TerminalSettings {
    fn default() -> Self {
        TerminalSettings {
            request_timeout_secs: default_terminal_timeout(),
            default_sales_ledger: default_sales_ledger(),
            url: default_terminal_url(),
        }
    }
}

impl TerminalSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The configured terminal URL as an endpoint.
    pub fn endpoint(&self) -> SyncResult<TenantEndpoint> {
        let url = Url::parse(&self.url)?;
        let host = url
            .host_str()
            .ok_or_else(|| SyncError::InvalidConfig(format!("terminal URL has no host: {}", self.url)))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| SyncError::InvalidConfig(format!("terminal URL has no port: {}", self.url)))?;

        Ok(TenantEndpoint {
            host: format!("{}://{}", url.scheme(), host),
            port,
            sales_ledger: self.default_sales_ledger.clone(),
        })
    }
}

// =============================================================================
// Bridge Settings
// =============================================================================

/// How a bridge agent reaches the central service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    #[serde(default = "default_central_url")]
    pub central_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Push the terminal's stock items to the central catalog each cycle.
    #[serde(default = "default_true")]
    pub catalog_import: bool,

    /// Timeout for calls to the central service. Default: 30
    #[serde(default = "default_central_timeout")]
    pub request_timeout_secs: u64,
}

fn default_central_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_central_timeout() -> u64 {
    30
}

impl Default for BridgeSettings {
    fn default() -> Self {
        BridgeSettings {
            central_url: default_central_url(),
            username: String::new(),
            password: String::new(),
            catalog_import: true,
            request_timeout_secs: default_central_timeout(),
        }
    }
}

impl BridgeSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration, shared by the central service and the
/// bridge agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub terminal: TerminalSettings,

    #[serde(default)]
    pub bridge: BridgeSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Validates settings shared by both binaries.
    pub fn validate(&self) -> SyncResult<()> {
        if self.scheduler.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "scheduler.interval_secs must be greater than 0".into(),
            ));
        }
        if self.scheduler.order_batch_limit == 0 || self.scheduler.price_level_batch_limit == 0 {
            return Err(SyncError::InvalidConfig(
                "batch limits must be greater than 0".into(),
            ));
        }
        if self.terminal.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "terminal.request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.terminal.default_sales_ledger.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "terminal.default_sales_ledger must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Additional checks for running as a bridge agent.
    pub fn validate_bridge(&self) -> SyncResult<()> {
        self.validate()?;
        self.terminal.endpoint()?;
        Url::parse(&self.bridge.central_url)?;
        if self.bridge.username.trim().is_empty() || self.bridge.password.is_empty() {
            return Err(SyncError::InvalidConfig(
                "bridge.username and bridge.password are required".into(),
            ));
        }
        Ok(())
    }

    /// Applies `LEDGERLINK_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("LEDGERLINK_SYNC_INTERVAL_SECS") {
            match v.parse() {
                Ok(secs) => self.scheduler.interval_secs = secs,
                Err(_) => warn!(value = %v, "Ignoring invalid LEDGERLINK_SYNC_INTERVAL_SECS"),
            }
        }
        if let Some(v) = lookup("LEDGERLINK_ORDER_BATCH_LIMIT") {
            match v.parse() {
                Ok(n) => self.scheduler.order_batch_limit = n,
                Err(_) => warn!(value = %v, "Ignoring invalid LEDGERLINK_ORDER_BATCH_LIMIT"),
            }
        }
        if let Some(v) = lookup("LEDGERLINK_PRICE_LEVEL_BATCH_LIMIT") {
            match v.parse() {
                Ok(n) => self.scheduler.price_level_batch_limit = n,
                Err(_) => warn!(value = %v, "Ignoring invalid LEDGERLINK_PRICE_LEVEL_BATCH_LIMIT"),
            }
        }
        if let Some(v) = lookup("LEDGERLINK_SCHEDULER_ENABLED") {
            self.scheduler.enabled = !matches!(v.to_lowercase().as_str(), "false" | "0" | "no");
        }

        if let Some(v) = lookup("LEDGERLINK_TERMINAL_URL") {
            debug!(url = %v, "Overriding terminal URL from environment");
            self.terminal.url = v;
        }
        if let Some(v) = lookup("LEDGERLINK_TERMINAL_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.terminal.request_timeout_secs = secs,
                Err(_) => warn!(value = %v, "Ignoring invalid LEDGERLINK_TERMINAL_TIMEOUT_SECS"),
            }
        }
        if let Some(v) = lookup("LEDGERLINK_SALES_LEDGER") {
            self.terminal.default_sales_ledger = v;
        }

        if let Some(v) = lookup("LEDGERLINK_CENTRAL_URL") {
            debug!(url = %v, "Overriding central URL from environment");
            self.bridge.central_url = v;
        }
        if let Some(v) = lookup("LEDGERLINK_USERNAME") {
            self.bridge.username = v;
        }
        if let Some(v) = lookup("LEDGERLINK_PASSWORD") {
            self.bridge.password = v;
        }
        if let Some(v) = lookup("LEDGERLINK_CATALOG_IMPORT") {
            self.bridge.catalog_import = !matches!(v.to_lowercase().as_str(), "false" | "0" | "no");
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "ledgerlink", "ledgerlink")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }
}
