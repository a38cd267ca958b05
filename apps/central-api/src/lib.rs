//! # Ledgerlink Central API
//!
//! Runs the sync scheduler and serves the polling REST surface used by
//! bridge agents.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Central API Services                             │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌────────────────────────┐│
//! │  │  auth_service  │  │  sync_service      │  │  erp_service           ││
//! │  │                │  │                    │  │                        ││
//! │  │ • login        │  │ • pending-orders   │  │ • connection test      ││
//! │  │                │  │ • pending-levels   │  │                        ││
//! │  │                │  │ • update statuses  │  │  health_service        ││
//! │  │                │  │ • sync-products    │  │ • /health              ││
//! │  └────────────────┘  └────────────────────┘  └────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │  SQLite (ledger-db) · SyncScheduler (ledger-sync) · JWT auth      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - HTTP server port (default: 3000)
//! - `DATABASE_PATH` - SQLite database file (default: ledgerlink.db)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 3600)
//! - `LEDGERLINK_CONFIG` - Sync settings file (TOML)

pub mod auth;
pub mod config;
pub mod error;
pub mod services;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use ledger_db::Database;
use ledger_sync::protocol::routes;
use ledger_sync::{SchedulerHandle, SyncClient};

// Re-exports
pub use auth::JwtManager;
pub use config::CentralConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    /// Client for connection tests from the settings screen.
    pub terminal: SyncClient,
    /// `None` when the scheduler is disabled.
    pub scheduler: Option<SchedulerHandle>,
}

/// Builds the REST router.
pub fn router(state: Arc<AppState>) -> Router {
    use services::{auth_service, erp_service, health_service, sync_service};

    Router::new()
        .route(routes::LOGIN, post(auth_service::login))
        .route(routes::PENDING_ORDERS, get(sync_service::pending_orders))
        .route(routes::PENDING_PRICE_LEVELS, get(sync_service::pending_price_levels))
        .route(routes::UPDATE_ORDER_STATUS, post(sync_service::update_order_status))
        .route(
            routes::UPDATE_PRICE_LEVEL_STATUS,
            post(sync_service::update_price_level_status),
        )
        .route(routes::SYNC_PRODUCTS, post(sync_service::sync_products))
        .route(routes::ERP_TEST, post(erp_service::test_connection))
        .route(routes::HEALTH, get(health_service::health))
        .with_state(state)
}
