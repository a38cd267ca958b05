//! # Ledgerlink Central API
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Central API Server                               │
//! │                                                                         │
//! │  Bridge agents ───► HTTP (3000) ───► services ───► SQLite              │
//! │                                                       ▲                 │
//! │                     SyncScheduler ────────────────────┘                 │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                   ERP terminals (XML over HTTP)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use central_api::{router, AppState, CentralConfig, JwtManager};
use ledger_db::{Database, DbConfig};
use ledger_sync::{SyncClient, SyncEngine, SyncScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting Ledgerlink central API...");

    // Load configuration
    let config = CentralConfig::load()?;
    info!(
        port = config.http_port,
        database = %config.database_path.display(),
        interval_secs = config.sync.scheduler.interval_secs,
        "Configuration loaded"
    );

    // Open database (migrations run on connect)
    let db = Database::new(DbConfig::new(config.database_path.clone()))
        .await
        .context("failed to open database")?;
    info!("Database ready");

    // Start the scheduler
    let scheduler = if config.sync.scheduler.enabled {
        let engine = SyncEngine::central(db.clone(), &config.sync)?;
        let scheduler = SyncScheduler::new(Arc::new(engine), config.sync.scheduler.interval());
        Some(scheduler.start()?)
    } else {
        info!("Sync scheduler disabled by configuration");
        None
    };

    let state = Arc::new(AppState {
        db: db.clone(),
        jwt: JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs),
        terminal: SyncClient::new(config.sync.terminal.request_timeout())?,
        scheduler: scheduler.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = scheduler {
        handle.stop().await;
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledger=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
