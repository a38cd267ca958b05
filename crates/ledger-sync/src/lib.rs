//! # ledger-sync: ERP Synchronization for Ledgerlink
//!
//! Pushes pending sales orders and price levels into tenants' ERP terminals
//! and pulls terminal catalogs back into the central store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Sync Architecture                              │
//! │                                                                         │
//! │  CENTRAL SERVICE                          BRIDGE AGENT                 │
//! │  ┌──────────────────┐                     ┌──────────────────┐         │
//! │  │  SyncScheduler   │                     │   BridgeAgent    │         │
//! │  │  startup + every │                     │  login, then     │         │
//! │  │  60s, no overlap │                     │  every interval  │         │
//! │  └────────┬─────────┘                     └────────┬─────────┘         │
//! │           ▼                                        ▼                    │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                          SyncEngine                             │   │
//! │  │  WorkSource        : StoreSource        | RestSource            │   │
//! │  │  TerminalLocator   : StoreLocator       | FixedLocator          │   │
//! │  │  SyncClient        : XML POST, 10s timeout, no retries          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  CatalogPipeline (bridge only): stock export ──► sync-products         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`engine`] - One reconciliation cycle and its report
//! - [`scheduler`] - Periodic, non-overlapping cycles for the central service
//! - [`bridge`] - Terminal-side agent driving the REST surface
//! - [`catalog`] - Stock item import with synthesized tiers
//! - [`client`] - HTTP transport to ERP terminals
//! - [`source`] - Where pending work comes from
//! - [`resolver`] - Which terminal serves an account
//! - [`auth`] - Bearer session against the central service
//! - [`protocol`] - REST request and response bodies
//! - [`config`] - Sync configuration (file + env)
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ledger_sync::{SyncConfig, SyncEngine, SyncScheduler};
//!
//! let config = SyncConfig::load(None)?;
//! let engine = SyncEngine::central(database, &config)?;
//! let scheduler = SyncScheduler::new(Arc::new(engine), config.scheduler.interval());
//!
//! let handle = scheduler.start()?;
//! // ...
//! handle.stop().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod protocol;

pub mod client;
pub mod engine;
pub mod resolver;
pub mod scheduler;
pub mod source;

pub mod auth;
pub mod bridge;
pub mod catalog;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{BridgeSettings, SchedulerSettings, SyncConfig, TerminalSettings};
pub use error::{SyncError, SyncResult};

pub use client::SyncClient;
pub use engine::{BatchLimits, CycleReport, RecordOutcome, SyncEngine, Tally};
pub use resolver::{FixedLocator, StoreLocator, TerminalLocator};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use source::{RestSource, StoreSource, WorkSource};

pub use auth::{AuthSession, Credentials};
pub use bridge::{BridgeAgent, BridgeReport};
pub use catalog::CatalogPipeline;
