//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Terminal       │  │  Central        │  │  Configuration          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │ TransportFailure│  │ Authentication  │  │  ConfigurationMissing   │ │
//! │  │ ProtocolError   │  │ CentralRejected │  │  InvalidConfig          │ │
//! │  │                 │  │                 │  │  ConfigLoadFailed       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  RETRYABLE: TransportFailure, ProtocolError, CentralRejected (5xx)     │
//! │  SKIP:      ConfigurationMissing (tenant has no endpoint)              │
//! │  FATAL:     AuthenticationFailed at bridge startup                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A terminal that answers with `AlreadyExists` is not an error at all; the
//! codec reports it as an [`ledger_core::Outcome`] and the engine treats it
//! as success.

use ledger_db::DbError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // ERP Terminal
    // =========================================================================
    /// No response within the timeout, connection refused, or a non-2xx
    /// status. Nothing is known about whether the terminal acted.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The terminal answered but reported an explicit error.
    #[error("ERP terminal reported an error: {0}")]
    ProtocolError(String),

    /// The account has no resolvable endpoint, on itself or its parent.
    ///
    /// ## When This Occurs
    /// - A tenant that never filled in the ERP settings screen
    /// - An employee whose tenant has no endpoint
    #[error("No ERP endpoint configured for account {account_id}")]
    ConfigurationMissing { account_id: String },

    // =========================================================================
    // Central Service
    // =========================================================================
    /// Login refused or a bearer token rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The central service answered with a non-success status.
    #[error("Central service returned {status}: {message}")]
    CentralRejected { status: u16, message: String },

    // =========================================================================
    // Configuration
    // =========================================================================
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Internal
    // =========================================================================
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// `SyncScheduler::start` called while a loop is already running.
    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::TransportFailure(format!("request timed out: {err}"))
        } else if err.is_decode() {
            SyncError::Serialization(err.to_string())
        } else {
            SyncError::TransportFailure(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidConfig(format!("invalid URL: {err}"))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if the same operation may succeed on a later cycle.
    ///
    /// ## Retryable Errors
    /// - Terminal unreachable or slow
    /// - Terminal reported an error (it may be fixed by the operator)
    /// - Central service 5xx
    /// - Store temporarily unavailable
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::TransportFailure(_) | SyncError::ProtocolError(_) => true,
            SyncError::CentralRejected { status, .. } => *status >= 500,
            SyncError::Store(e) => !e.is_client_error(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::ConfigurationMissing { .. }
                | SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
        )
    }

    /// Returns true if the process should stop rather than loop.
    ///
    /// Only meaningful at bridge startup; inside a cycle every error is
    /// logged and the cycle continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::AuthenticationFailed(_)
                | SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::TransportFailure("refused".into()).is_retryable());
        assert!(SyncError::ProtocolError("LINEERROR".into()).is_retryable());
        assert!(SyncError::CentralRejected {
            status: 503,
            message: "busy".into()
        }
        .is_retryable());

        assert!(!SyncError::CentralRejected {
            status: 400,
            message: "bad".into()
        }
        .is_retryable());
        assert!(!SyncError::AuthenticationFailed("nope".into()).is_retryable());
        assert!(!SyncError::ConfigurationMissing {
            account_id: "a".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_store_errors_split_by_cause() {
        assert!(SyncError::Store(DbError::PoolExhausted).is_retryable());
        assert!(!SyncError::Store(DbError::not_found("Order", "x")).is_retryable());
    }

    #[test]
    fn test_classification() {
        let missing = SyncError::ConfigurationMissing {
            account_id: "t1".into(),
        };
        assert!(missing.is_config_error());
        assert!(!missing.is_fatal());
        assert!(missing.to_string().contains("t1"));

        assert!(SyncError::AuthenticationFailed("401".into()).is_fatal());
        assert!(!SyncError::TransportFailure("x".into()).is_fatal());
    }
}
