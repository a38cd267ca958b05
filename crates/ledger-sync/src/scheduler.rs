//! # Job Scheduler
//!
//! Runs [`SyncEngine::run_cycle`] at startup and then every interval.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scheduler Lifecycle                                │
//! │                                                                         │
//! │  SyncScheduler::new(engine, 60s)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  start() ──► SchedulerHandle        (second start() → AlreadyRunning)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────── loop ─────────────┐                                      │
//! │  │ tick (first one immediate)    │                                      │
//! │  │ or handle.trigger()           │──► run_cycle() ──► last_report      │
//! │  │ or handle.stop() ──► exit     │                                      │
//! │  └───────────────────────────────┘                                      │
//! │                                                                         │
//! │  Cycles never overlap: a tick that fires during a cycle is absorbed    │
//! │  (MissedTickBehavior::Delay) and the next cycle starts after it ends.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::{CycleReport, SyncEngine};
use crate::error::{SyncError, SyncResult};

/// Owns the periodic loop. At most one loop runs per scheduler.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, interval: Duration) -> Self {
        SyncScheduler {
            engine,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the loop. Must be called inside a Tokio runtime.
    ///
    /// ## Errors
    /// * `AlreadyRunning` - a loop from an earlier `start` has not stopped
    pub fn start(&self) -> SyncResult<SchedulerHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::AlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (report_tx, report_rx) = watch::channel(None);

        let task = tokio::spawn(run_loop(
            Arc::clone(&self.engine),
            self.interval,
            Arc::clone(&self.running),
            shutdown_rx,
            trigger_rx,
            report_tx,
        ));

        info!(interval_secs = self.interval.as_secs(), "Sync scheduler started");
        Ok(SchedulerHandle {
            shutdown_tx,
            trigger_tx,
            report_rx,
            running: Arc::clone(&self.running),
            task: Arc::new(Mutex::new(Some(task))),
        })
    }
}

async fn run_loop(
    engine: Arc<SyncEngine>,
    period: Duration,
    running: Arc<AtomicBool>,
    mut shutdown_rx: mpsc::Receiver<()>,
    mut trigger_rx: mpsc::Receiver<()>,
    report_tx: watch::Sender<Option<CycleReport>>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}

            Some(()) = trigger_rx.recv() => {
                debug!("Sync cycle triggered");
            }

            // Explicit stop, or every handle dropped
            _ = shutdown_rx.recv() => {
                info!("Sync scheduler shutting down");
                break;
            }
        }

        let report = engine.run_cycle().await;
        report_tx.send_replace(Some(report));
    }

    running.store(false, Ordering::SeqCst);
    info!("Sync scheduler stopped");
}

/// Control handle for a running scheduler. Cheap to clone.
///
/// Dropping every clone stops the loop after the current cycle.
#[derive(Clone)]
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    trigger_tx: mpsc::Sender<()>,
    report_rx: watch::Receiver<Option<CycleReport>>,
    running: Arc<AtomicBool>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SchedulerHandle {
    /// Stops the loop and waits for it to exit. A cycle in flight is
    /// allowed to finish first.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Sync scheduler task ended abnormally");
            }
        }
    }

    /// Requests a cycle now. A request made while one is already queued is
    /// merged into it.
    pub fn trigger(&self) -> SyncResult<()> {
        match self.trigger_tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(())) => {
                Err(SyncError::ChannelError("scheduler is not running".into()))
            }
        }
    }

    /// Report of the most recent finished cycle.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.report_rx.borrow().clone()
    }

    /// Resolves with the report of the next cycle to finish after this call.
    /// Resolves to `None` if the loop stops first.
    pub fn next_report(&self) -> impl Future<Output = Option<CycleReport>> + Send + 'static {
        let mut rx = self.report_rx.clone();
        rx.borrow_and_update();
        async move {
            rx.changed().await.ok()?;
            let report = rx.borrow().clone();
            report
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
