//! # Bridge Agent
//!
//! Runs next to one ERP terminal and reconciles it against the central
//! service over REST, for deployments where the central service cannot
//! reach the terminal itself.
//!
//! ## Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         BridgeAgent cycle                               │
//! │                                                                         │
//! │  1. SyncEngine (RestSource + FixedLocator)                             │
//! │       GET  pending price levels ──► company-list ──► mark synced       │
//! │       GET  pending orders ──► ledger + voucher ──► mark posted         │
//! │                                                                         │
//! │  2. CatalogPipeline (if bridge.catalog_import)                         │
//! │       stock export ──► POST sync-products                              │
//! │                                                                         │
//! │  Login happens once at connect; an expired token is renewed on the    │
//! │  next request that needs it.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::auth::{AuthSession, Credentials};
use crate::catalog::CatalogPipeline;
use crate::client::SyncClient;
use crate::config::SyncConfig;
use crate::engine::{BatchLimits, CycleReport, SyncEngine};
use crate::error::{SyncError, SyncResult};
use crate::protocol::CatalogImportSummary;
use crate::resolver::FixedLocator;
use crate::source::RestSource;

/// Result of one bridge cycle.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeReport {
    pub cycle: CycleReport,
    /// `None` when catalog import is disabled.
    pub catalog: Option<CatalogImportSummary>,
    pub catalog_error: Option<String>,
}

pub struct BridgeAgent {
    engine: SyncEngine,
    catalog: Option<CatalogPipeline>,
    session: Arc<AuthSession>,
    interval: Duration,
}

impl BridgeAgent {
    /// Builds the agent and logs in.
    ///
    /// ## Errors
    /// * `InvalidConfig` - bridge settings are incomplete
    /// * `AuthenticationFailed` - the central service refused the credentials
    /// * `TransportFailure` - the central service could not be reached
    pub async fn connect(config: &SyncConfig) -> SyncResult<Self> {
        config.validate_bridge()?;

        let http = reqwest::Client::builder()
            .timeout(config.bridge.request_timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let session = Arc::new(AuthSession::new(
            http.clone(),
            config.bridge.central_url.clone(),
            Credentials {
                username: config.bridge.username.clone(),
                password: config.bridge.password.clone(),
            },
        ));
        session.login().await?;

        let terminal = config.terminal.endpoint()?;
        let client = SyncClient::new(config.terminal.request_timeout())?;
        let source = RestSource::new(http, Arc::clone(&session));

        let catalog = config.bridge.catalog_import.then(|| {
            CatalogPipeline::new(client.clone(), terminal.clone(), source.clone())
        });

        let engine = SyncEngine::new(
            Arc::new(source),
            Arc::new(FixedLocator::new(terminal.clone())),
            client,
            BatchLimits {
                orders: config.scheduler.order_batch_limit,
                price_levels: config.scheduler.price_level_batch_limit,
            },
        );

        info!(
            central = %session.base_url(),
            terminal = %terminal.url(),
            catalog_import = catalog.is_some(),
            "Bridge agent connected"
        );

        Ok(BridgeAgent {
            engine,
            catalog,
            session,
            interval: config.scheduler.interval(),
        })
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Runs one cycle. Failures are logged and reported, never returned.
    pub async fn run_cycle(&self) -> BridgeReport {
        let cycle = self.engine.run_cycle().await;

        let (catalog, catalog_error) = match &self.catalog {
            None => (None, None),
            Some(pipeline) => match pipeline.run_once().await {
                Ok(summary) => (Some(summary), None),
                Err(e) => {
                    warn!(error = %e, "Catalog import failed, will retry next cycle");
                    (None, Some(e.to_string()))
                }
            },
        };

        BridgeReport {
            cycle,
            catalog,
            catalog_error,
        }
    }

    /// Runs cycles every interval until `shutdown` resolves. The first cycle
    /// runs immediately.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                    if !self.session.is_authenticated().await {
                        error!("Central service rejected the session, logging in again next cycle");
                    }
                }
                _ = &mut shutdown => {
                    info!("Bridge agent shutting down");
                    break;
                }
            }
        }
    }
}
