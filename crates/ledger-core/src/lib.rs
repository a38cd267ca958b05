//! # ledger-core: Pure Domain Logic for Ledgerlink
//!
//! Everything the central scheduler and the bridge agent must agree on,
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledgerlink Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────────┐        ┌──────────────────────────┐      │
//! │  │  central-api (scheduler) │        │  bridge-agent (per LAN)  │      │
//! │  └────────────┬─────────────┘        └─────────────┬────────────┘      │
//! │               │                                    │                    │
//! │  ┌────────────▼────────────────────────────────────▼────────────┐      │
//! │  │                 ledger-sync (SyncEngine)                     │      │
//! │  └────────────────────────────┬─────────────────────────────────┘      │
//! │                               │                                         │
//! │  ┌────────────────────────────▼─────────────────────────────────┐      │
//! │  │               ★ ledger-core (THIS CRATE) ★                   │      │
//! │  │                                                              │      │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌────────┐ │      │
//! │  │  │  types  │ │  money  │ │ pricing │ │  codec  │ │validate│ │      │
//! │  │  │ Order   │ │ Money   │ │ tiers   │ │ XML in  │ │ rules  │ │      │
//! │  │  │ Level   │ │ TaxRate │ │ totals  │ │ XML out │ │        │ │      │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └─────────┘ └────────┘ │      │
//! │  │                                                              │      │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │      │
//! │  └──────────────────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Orders, price levels, products, endpoints, sync states
//! - [`money`] - Integer money with decimal text at the protocol edge
//! - [`pricing`] - Tier resolution and tier synthesis
//! - [`codec`] - ERP envelope builders and response decoders
//! - [`validation`] - Input rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use ledger_core::codec::{build_ledger_create, parse_outcome, Outcome};
//!
//! let envelope = build_ledger_create("Acme Traders");
//! assert!(envelope.contains("<PARENT>Sundry Debtors</PARENT>"));
//!
//! let reply = "<RESPONSE><LINEERROR>Ledger already exists</LINEERROR></RESPONSE>";
//! assert_eq!(parse_outcome(reply), Outcome::AlreadyExists);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codec;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use codec::Outcome;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// The system-defined price tier every tenant has.
pub const STANDARD_PRICE_LEVEL: &str = "Standard";

/// Sales ledger used when a tenant has not configured one.
pub const DEFAULT_SALES_LEDGER: &str = "Sales";

/// Ledger group customer ledgers are created under.
pub const CUSTOMER_LEDGER_GROUP: &str = "Sundry Debtors";

/// Unit suffix on voucher rates and quantities.
pub const STOCK_UNIT: &str = "Pcs";

/// Pending orders discovered per cycle.
pub const DEFAULT_ORDER_BATCH: u32 = 50;

/// Pending price levels discovered per cycle.
pub const DEFAULT_PRICE_LEVEL_BATCH: u32 = 20;

/// Maximum quantity of a single line.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum lines on a single order.
pub const MAX_ORDER_LINES: usize = 200;
