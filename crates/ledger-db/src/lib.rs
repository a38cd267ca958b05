//! # ledger-db: Reconciliation Store for Ledgerlink
//!
//! The durable record of orders, price levels, and products together with
//! their sync state. Read by the scheduler's discovery step and by the
//! REST surface bridge agents poll; written after every attempt.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledgerlink Data Flow                             │
//! │                                                                         │
//! │  SyncScheduler (central)          /integration/* (bridge agents)       │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ledger-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │◄───│ AccountRepository  │  │ (embedded) │  │   │
//! │  │   │  SqlitePool   │    │ OrderRepository    │  │ 001, 002   │  │   │
//! │  │   │               │    │ PriceLevelRepo..   │  │            │  │   │
//! │  │   │               │    │ ProductRepository  │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Updates Are Targeted
//! Every "mark" operation updates exactly one row and only from the
//! expected prior state (`WHERE id = ? AND sync_state = 'pending'`), so
//! re-applying it is harmless and never overwrites an earlier voucher
//! reference.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ledgerlink.db")).await?;
//! let batch = db.orders().fetch_pending(50).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::account::{AccountRepository, LoginRecord, NewAccount};
pub use repository::order::OrderRepository;
pub use repository::price_level::PriceLevelRepository;
pub use repository::product::{CatalogImportSummary, NewProduct, ProductRepository};
