//! # Sync Engine
//!
//! One reconciliation cycle, shared by the central scheduler and the
//! bridge agent.
//!
//! ## Cycle Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         run_cycle()                                     │
//! │                                                                         │
//! │        ┌───────────────── tokio::join! ─────────────────┐               │
//! │        ▼                                                ▼               │
//! │  ORDERS (sequential)                        PRICE LEVELS (sequential)  │
//! │  pending_orders(50)                         pending_price_levels(20)   │
//! │   for each:                                  for each:                 │
//! │    locate terminal ── none ──► skip           locate ── none ──► skip  │
//! │    ensure customer ledger                     company-list request     │
//! │    (Error is logged, not fatal)               any answer ──► synced    │
//! │    voucher create                                                      │
//! │     Success/AlreadyExists ──► posted                                   │
//! │     Error / no answer ──► stays pending                                │
//! │                                                                         │
//! │  A failure in one record never stops the others.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::client::SyncClient;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::resolver::{StoreLocator, TerminalLocator};
use crate::source::{StoreSource, WorkSource};
use ledger_core::codec::{build_ledger_create, build_voucher_create, parse_outcome};
use ledger_core::{Outcome, PendingOrder, PriceLevel, VoucherReference};
use ledger_db::Database;

// =============================================================================
// Reports
// =============================================================================

/// What happened to one record in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The state moved forward.
    Applied,
    /// The terminal accepted it but the record was already marked.
    AlreadyApplied,
    /// No endpoint for the owning tenant.
    Skipped,
}

/// Counts for one kind of record in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Discovery itself failed; nothing was attempted.
    pub discovery_error: Option<String>,
}

impl Tally {
    fn record(&mut self, result: &SyncResult<RecordOutcome>) {
        match result {
            Ok(RecordOutcome::Applied | RecordOutcome::AlreadyApplied) => self.succeeded += 1,
            Ok(RecordOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Summary of one cycle, kept as the scheduler's last report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub orders: Tally,
    pub price_levels: Tally,
}

impl CycleReport {
    pub fn orders_posted(&self) -> usize {
        self.orders.succeeded
    }

    pub fn price_levels_synced(&self) -> usize {
        self.price_levels.succeeded
    }

    pub fn is_clean(&self) -> bool {
        self.orders.failed == 0
            && self.price_levels.failed == 0
            && self.orders.discovery_error.is_none()
            && self.price_levels.discovery_error.is_none()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Discovery batch sizes.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub orders: u32,
    pub price_levels: u32,
}

impl Default for BatchLimits {
    fn default() -> Self {
        BatchLimits {
            orders: ledger_core::DEFAULT_ORDER_BATCH,
            price_levels: ledger_core::DEFAULT_PRICE_LEVEL_BATCH,
        }
    }
}

/// Reconciles pending orders and price levels against ERP terminals.
pub struct SyncEngine {
    source: Arc<dyn WorkSource>,
    locator: Arc<dyn TerminalLocator>,
    client: SyncClient,
    limits: BatchLimits,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn WorkSource>,
        locator: Arc<dyn TerminalLocator>,
        client: SyncClient,
        limits: BatchLimits,
    ) -> Self {
        SyncEngine {
            source,
            locator,
            client,
            limits,
        }
    }

    /// Engine for the central service: store-backed work, store-resolved
    /// endpoints.
    pub fn central(db: Database, config: &SyncConfig) -> SyncResult<Self> {
        Ok(SyncEngine::new(
            Arc::new(StoreSource::new(db.clone())),
            Arc::new(StoreLocator::new(db)),
            SyncClient::new(config.terminal.request_timeout())?,
            BatchLimits {
                orders: config.scheduler.order_batch_limit,
                price_levels: config.scheduler.price_level_batch_limit,
            },
        ))
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    /// Runs one cycle. Never fails: every error is logged and counted.
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        info!("Sync cycle starting");

        let (orders, price_levels) = tokio::join!(self.sync_orders(), self.sync_price_levels());

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            orders,
            price_levels,
        };
        info!(
            orders_posted = report.orders.succeeded,
            orders_failed = report.orders.failed,
            orders_skipped = report.orders.skipped,
            price_levels_synced = report.price_levels.succeeded,
            price_levels_failed = report.price_levels.failed,
            duration_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Sync cycle finished"
        );
        report
    }

    async fn sync_orders(&self) -> Tally {
        let mut tally = Tally::default();
        let batch = match self.source.pending_orders(self.limits.orders).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "Failed to discover pending orders");
                tally.discovery_error = Some(e.to_string());
                return tally;
            }
        };
        tally.discovered = batch.len();

        for pending in &batch {
            let result = self.process_order(pending).await;
            log_failure("order", &pending.order.id, &result);
            tally.record(&result);
        }
        tally
    }

    async fn sync_price_levels(&self) -> Tally {
        let mut tally = Tally::default();
        let batch = match self.source.pending_price_levels(self.limits.price_levels).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "Failed to discover pending price levels");
                tally.discovery_error = Some(e.to_string());
                return tally;
            }
        };
        tally.discovered = batch.len();

        for level in &batch {
            let result = self.process_price_level(level).await;
            log_failure("price_level", &level.id, &result);
            tally.record(&result);
        }
        tally
    }

    /// Posts one order as a Sales Order voucher.
    ///
    /// ## What This Does
    /// 1. Locates the tenant's terminal (none → `Skipped`)
    /// 2. Ensures the customer ledger exists; an explicit Error here is
    ///    logged and the voucher is still attempted
    /// 3. Sends the voucher; Success or AlreadyExists marks the order
    ///    posted with the order number and the processing time
    ///
    /// An unreachable terminal at step 2 fails the order without step 3.
    pub async fn process_order(&self, pending: &PendingOrder) -> SyncResult<RecordOutcome> {
        let order = &pending.order;
        let Some(endpoint) = self.locator.locate(&order.account_id).await? else {
            debug!(order_id = %order.id, account_id = %order.account_id, "No ERP endpoint, skipping order");
            return Ok(RecordOutcome::Skipped);
        };

        let ledger_body = self
            .client
            .send(&build_ledger_create(&order.customer_name), &endpoint)
            .await?;
        match parse_outcome(&ledger_body) {
            Outcome::Success => debug!(customer = %order.customer_name, "Customer ledger created"),
            Outcome::AlreadyExists => debug!(customer = %order.customer_name, "Customer ledger exists"),
            Outcome::Error(message) => warn!(
                order_id = %order.id,
                customer = %order.customer_name,
                error = %message,
                "Customer ledger create failed, attempting voucher anyway"
            ),
        }

        let sales_ledger = pending
            .sales_ledger
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(endpoint.sales_ledger.as_str());
        let envelope = build_voucher_create(order, &pending.lines, sales_ledger);
        let body = self.client.send(&envelope, &endpoint).await?;

        if let Outcome::Error(message) = parse_outcome(&body) {
            return Err(SyncError::ProtocolError(message));
        }

        let voucher = VoucherReference {
            number: order.order_number.clone(),
            date: Utc::now(),
        };
        if self.source.mark_order_posted(&order.id, &voucher).await? {
            info!(
                order_id = %order.id,
                voucher = %voucher.number,
                endpoint = %endpoint.url(),
                "Order posted to ERP"
            );
            Ok(RecordOutcome::Applied)
        } else {
            debug!(order_id = %order.id, "Order was already posted");
            Ok(RecordOutcome::AlreadyApplied)
        }
    }

    /// Confirms a price level against its tenant's terminal.
    ///
    /// Any answer to the company-list request counts as confirmation.
    pub async fn process_price_level(&self, level: &PriceLevel) -> SyncResult<RecordOutcome> {
        let Some(endpoint) = self.locator.locate(&level.account_id).await? else {
            debug!(price_level_id = %level.id, "No ERP endpoint, skipping price level");
            return Ok(RecordOutcome::Skipped);
        };

        self.client.test_connection(&endpoint).await?;

        if self.source.mark_price_level_synced(&level.id).await? {
            info!(price_level_id = %level.id, name = %level.name, "Price level synced");
            Ok(RecordOutcome::Applied)
        } else {
            Ok(RecordOutcome::AlreadyApplied)
        }
    }
}

fn log_failure(kind: &str, id: &str, result: &SyncResult<RecordOutcome>) {
    let Err(e) = result else { return };
    match e {
        SyncError::ConfigurationMissing { .. } => {
            debug!(kind, id, error = %e, "Skipped")
        }
        SyncError::Store(_) => error!(kind, id, error = %e, "Store update failed"),
        _ => warn!(kind, id, error = %e, "Sync attempt failed, will retry next cycle"),
    }
}
