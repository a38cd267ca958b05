//! # Ledgerlink Bridge Agent
//!
//! ```text
//! load config ──► validate ──► login ──┬── refused ──► exit(1)
//!                                      │
//!                                      ▼
//!                        cycle every interval until Ctrl+C
//! ```
//!
//! Configuration is the shared sync TOML file (path from the first
//! argument, else the platform default) plus `LEDGERLINK_*` overrides.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ledger_sync::{BridgeAgent, SyncConfig};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Bridge agent exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = SyncConfig::load(config_path)?;
    config.validate_bridge()?;
    info!(
        central = %config.bridge.central_url,
        terminal = %config.terminal.url,
        interval_secs = config.scheduler.interval_secs,
        "Configuration loaded"
    );

    // Bad credentials end the process here rather than looping
    let agent = BridgeAgent::connect(&config).await?;

    agent.run(shutdown_signal()).await;
    info!("Bridge agent stopped");
    Ok(())
}

/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledger=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
