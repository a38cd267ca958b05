//! # Domain Types
//!
//! Core domain types shared by the central service and the bridge agent.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   PriceLevel    │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  order_number   │   │  name           │   │  name           │       │
//! │  │  sync_state     │   │  sync_state     │   │  base_price     │       │
//! │  │  voucher ref    │   │  is_standard    │   │  stock          │       │
//! │  └────────┬────────┘   └─────────────────┘   └────────┬────────┘       │
//! │           │ 1:N                                        │ 1:N            │
//! │  ┌────────▼────────┐                          ┌────────▼────────┐       │
//! │  │   OrderLine     │                          │  ProductPrice   │       │
//! │  │  rate snapshot  │                          │ (product,level) │       │
//! │  └─────────────────┘                          └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ OrderSyncState  │   │PriceLevelSync.. │   │ TenantEndpoint  │       │
//! │  │  Pending        │   │  Local          │   │  host + port    │       │
//! │  │  PostedToErp    │   │  PendingSync    │   │  sales_ledger   │       │
//! │  └─────────────────┘   │  Synced         │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tenants and Accounts
//! A tenant is an account. Employee accounts point at their tenant through
//! `parent_id` and inherit its ERP endpoint (one hop, never deeper).
//! Every syncable record is owned by the account that created it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (a common GST slab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Sync States
// =============================================================================

/// Where an order stands in the ERP pipeline.
///
/// ## State Machine
/// ```text
/// ┌──────────┐  voucher accepted   ┌──────────────┐
/// │ Pending  │ ──────────────────► │ PostedToErp  │
/// └──────────┘   (exactly once)    └──────────────┘
///      ▲   │
///      └───┘ transport failure / protocol error (retry next cycle)
/// ```
///
/// There is no edge back to `Pending`. Only an administrative correction
/// outside the sync engine could do that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderSyncState {
    /// Created at checkout, not yet accepted by the ERP terminal.
    Pending,
    /// Voucher accepted; voucher reference recorded.
    PostedToErp,
}

impl OrderSyncState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderSyncState::Pending => "pending",
            OrderSyncState::PostedToErp => "posted_to_erp",
        }
    }

    /// Whether moving from `self` to `next` is a transition the sync
    /// pipeline may apply. Re-applying the current state is allowed.
    pub fn can_transition_to(&self, next: OrderSyncState) -> bool {
        matches!(
            (self, next),
            (OrderSyncState::Pending, _) | (OrderSyncState::PostedToErp, OrderSyncState::PostedToErp)
        )
    }
}

impl Default for OrderSyncState {
    fn default() -> Self {
        OrderSyncState::Pending
    }
}

/// Where a price level stands relative to the ERP terminal.
///
/// The Standard level is always `Local`: it is system-defined and never
/// needs a network round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PriceLevelSyncState {
    /// Exists only in the central catalog.
    Local,
    /// Waiting for the next cycle to reach the ERP terminal.
    PendingSync,
    /// Confirmed against the ERP terminal.
    Synced,
}

impl PriceLevelSyncState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PriceLevelSyncState::Local => "local",
            PriceLevelSyncState::PendingSync => "pending_sync",
            PriceLevelSyncState::Synced => "synced",
        }
    }

    pub fn can_transition_to(&self, next: PriceLevelSyncState) -> bool {
        matches!(
            (self, next),
            (PriceLevelSyncState::PendingSync, PriceLevelSyncState::Synced)
                | (PriceLevelSyncState::PendingSync, PriceLevelSyncState::PendingSync)
                | (PriceLevelSyncState::Synced, PriceLevelSyncState::Synced)
        )
    }
}

impl Default for PriceLevelSyncState {
    fn default() -> Self {
        PriceLevelSyncState::Local
    }
}

/// Account lifecycle status. Inactive accounts cannot log in, and neither
/// can employees of an inactive tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl Default for AccountStatus {
    fn default() -> Self {
        AccountStatus::Active
    }
}

// =============================================================================
// Accounts & Endpoints
// =============================================================================

/// A user account. Accounts without a parent are tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,

    /// Tenant account this employee belongs to. `None` for tenants.
    pub parent_id: Option<String>,

    pub username: String,
    pub status: AccountStatus,

    /// ERP terminal host as configured (may include a scheme).
    pub erp_host: Option<String>,
    pub erp_port: Option<u16>,

    /// Ledger that sales amounts are allocated against.
    pub sales_ledger: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Endpoint fields declared directly on this account.
    pub fn endpoint_declaration(&self) -> EndpointDeclaration {
        EndpointDeclaration {
            host: self.erp_host.clone(),
            port: self.erp_port,
            sales_ledger: self.sales_ledger.clone(),
        }
    }

    /// Tenant this account belongs to: its parent, or itself.
    pub fn tenant_id(&self) -> &str {
        self.parent_id.as_deref().unwrap_or(&self.id)
    }
}

/// Resolved address of a tenant's ERP terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantEndpoint {
    pub host: String,
    pub port: u16,
    /// Sales ledger for accounting allocations. Defaults to
    /// [`crate::DEFAULT_SALES_LEDGER`].
    pub sales_ledger: String,
}

impl TenantEndpoint {
    /// Full URL the envelope is POSTed to.
    ///
    /// Hosts stored without a scheme are treated as plain HTTP.
    ///
    /// ```rust
    /// use ledger_core::types::TenantEndpoint;
    ///
    /// let ep = TenantEndpoint {
    ///     host: "192.168.1.20".into(),
    ///     port: 9000,
    ///     sales_ledger: "Sales".into(),
    /// };
    /// assert_eq!(ep.url(), "http://192.168.1.20:9000");
    /// ```
    pub fn url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host, self.port)
        } else {
            format!("http://{}:{}", host, self.port)
        }
    }
}

/// Endpoint fields as declared on one account row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointDeclaration {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub sales_ledger: Option<String>,
}

impl EndpointDeclaration {
    fn address(&self) -> Option<(String, u16)> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) if !host.trim().is_empty() && port > 0 => {
                Some((host.trim().to_string(), port))
            }
            _ => None,
        }
    }

    fn ledger(&self) -> Option<&str> {
        self.sales_ledger
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Resolves an account's terminal endpoint.
    ///
    /// ## Rules
    /// ```text
    /// own address declared?      ──► own
    /// else parent address?       ──► parent's (one hop, never further)
    /// else                       ──► None (caller skips the tenant)
    ///
    /// sales ledger: own ──► parent's ──► "Sales"
    /// ```
    ///
    /// The parent's own parent is never consulted, so resolution always
    /// terminates.
    pub fn resolve(own: &Self, parent: Option<&Self>) -> Option<TenantEndpoint> {
        let (host, port) = own.address().or_else(|| parent.and_then(Self::address))?;
        let sales_ledger = own
            .ledger()
            .or_else(|| parent.and_then(Self::ledger))
            .unwrap_or(crate::DEFAULT_SALES_LEDGER)
            .to_string();

        Some(TenantEndpoint {
            host,
            port,
            sales_ledger,
        })
    }
}

// =============================================================================
// Orders
// =============================================================================

/// An order as it travels through the sync pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,

    /// Account that placed the order.
    pub account_id: String,

    /// Human-readable number, `ORD-<millis>-<account>`. Also used as the
    /// voucher number.
    pub order_number: String,

    pub customer_name: String,
    pub order_date: DateTime<Utc>,

    /// Price tier the line rates were resolved against.
    pub price_level: Option<String>,
    pub payment_mode: Option<String>,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,

    pub sync_state: OrderSyncState,
    pub voucher_number: Option<String>,
    pub voucher_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Voucher reference, present once the order has been posted.
    pub fn voucher_reference(&self) -> Option<VoucherReference> {
        match (&self.voucher_number, self.voucher_date) {
            (Some(number), Some(date)) => Some(VoucherReference {
                number: number.clone(),
                date,
            }),
            _ => None,
        }
    }
}

/// A line item with its rate snapshotted at order time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,

    /// Product name at order time.
    pub product_name: String,

    /// Stock-item name in the ERP terminal, when the product came from an
    /// ERP catalog import.
    pub erp_item_name: Option<String>,

    pub quantity: i64,
    pub rate_cents: i64,
    /// `rate * quantity`, computed once at order time.
    pub amount_cents: i64,
    pub tax_rate_bps: u32,
}

impl OrderLine {
    pub fn rate(&self) -> Money {
        Money::from_cents(self.rate_cents)
    }

    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Name used for `STOCKITEMNAME`: the ERP item name, else the product
    /// name.
    pub fn stock_item_name(&self) -> &str {
        self.erp_item_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.product_name)
    }
}

/// A pending order with its lines pre-joined, as handed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    /// Sales ledger declared for the owning tenant, if any.
    pub sales_ledger: Option<String>,
}

/// Identifier/date pair recorded once a voucher is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherReference {
    pub number: String,
    pub date: DateTime<Utc>,
}

/// Input for creating an order at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub account_id: String,
    pub customer_name: String,
    pub price_level: Option<String>,
    pub payment_mode: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: String,
    pub quantity: i64,
    pub tax_rate: TaxRate,
}

// =============================================================================
// Price Levels & Products
// =============================================================================

/// A named price tier owned by a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevel {
    pub id: String,
    pub account_id: String,
    pub name: String,
    /// The system-defined Standard tier. Never deletable, never synced.
    pub is_standard: bool,
    pub sync_state: PriceLevelSyncState,
    pub created_at: DateTime<Utc>,
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub base_price_cents: i64,
    /// Stock on hand. Fractional because ERP terminals report decimals.
    pub stock: f64,
    pub erp_guid: Option<String>,
    pub erp_item_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }
}

/// Price of one product under one price level. Unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub product_id: String,
    pub price_level_id: String,
    pub price_cents: i64,
}

// =============================================================================
// Catalog Import
// =============================================================================

/// One stock item decoded from an ERP export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub name: String,
    /// Absolute value of the opening balance.
    pub stock: f64,
    pub price: Money,
    /// ERP GUID, or the item name when the terminal sends none.
    pub external_id: String,
}

/// A named tier price in a catalog push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPrice {
    pub level: String,
    pub price: Money,
}

/// A product as pushed to the central catalog by a bridge agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub name: String,
    pub stock: f64,
    pub price: Money,
    pub guid: String,
    pub prices: Vec<TierPrice>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(erp_name: Option<&str>) -> OrderLine {
        OrderLine {
            id: "l1".into(),
            order_id: "o1".into(),
            product_id: "p1".into(),
            product_name: "Widget".into(),
            erp_item_name: erp_name.map(String::from),
            quantity: 1,
            rate_cents: 100,
            amount_cents: 100,
            tax_rate_bps: 0,
        }
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(18.0).bps(), 1800);
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
    }

    #[test]
    fn test_order_state_is_forward_only() {
        assert!(OrderSyncState::Pending.can_transition_to(OrderSyncState::PostedToErp));
        assert!(OrderSyncState::PostedToErp.can_transition_to(OrderSyncState::PostedToErp));
        assert!(!OrderSyncState::PostedToErp.can_transition_to(OrderSyncState::Pending));
    }

    #[test]
    fn test_price_level_state_transitions() {
        use PriceLevelSyncState::*;
        assert!(PendingSync.can_transition_to(Synced));
        assert!(Synced.can_transition_to(Synced));
        assert!(!Synced.can_transition_to(PendingSync));
        assert!(!Local.can_transition_to(Synced));
    }

    #[test]
    fn test_state_serde_names() {
        assert_eq!(
            serde_json::to_string(&OrderSyncState::PostedToErp).unwrap(),
            "\"posted_to_erp\""
        );
        assert_eq!(
            serde_json::from_str::<PriceLevelSyncState>("\"pending_sync\"").unwrap(),
            PriceLevelSyncState::PendingSync
        );
    }

    #[test]
    fn test_endpoint_url() {
        let mut ep = TenantEndpoint {
            host: "http://erp.local/".into(),
            port: 9000,
            sales_ledger: "Sales".into(),
        };
        assert_eq!(ep.url(), "http://erp.local:9000");

        ep.host = "10.0.0.5".into();
        assert_eq!(ep.url(), "http://10.0.0.5:9000");
    }

    fn decl(host: Option<&str>, port: Option<u16>, ledger: Option<&str>) -> EndpointDeclaration {
        EndpointDeclaration {
            host: host.map(String::from),
            port,
            sales_ledger: ledger.map(String::from),
        }
    }

    #[test]
    fn test_resolve_inherits_parent_endpoint() {
        let own = decl(None, None, None);
        let parent = decl(Some("10.0.0.9"), Some(9000), Some("Online Sales"));
        let ep = EndpointDeclaration::resolve(&own, Some(&parent)).unwrap();
        assert_eq!(ep.host, "10.0.0.9");
        assert_eq!(ep.sales_ledger, "Online Sales");
    }

    #[test]
    fn test_resolve_prefers_own_endpoint() {
        let own = decl(Some("own.local"), Some(9001), None);
        let parent = decl(Some("parent.local"), Some(9000), Some("Parent Sales"));
        let ep = EndpointDeclaration::resolve(&own, Some(&parent)).unwrap();
        assert_eq!(ep.host, "own.local");
        assert_eq!(ep.port, 9001);
        assert_eq!(ep.sales_ledger, "Parent Sales");
    }

    #[test]
    fn test_resolve_none_without_any_endpoint() {
        let own = decl(Some("host-only"), None, Some("X"));
        assert!(EndpointDeclaration::resolve(&own, None).is_none());
        assert!(EndpointDeclaration::resolve(&own, Some(&decl(None, Some(9000), None))).is_none());
    }

    #[test]
    fn test_resolve_defaults_sales_ledger() {
        let own = decl(Some("h"), Some(1), Some("  "));
        let ep = EndpointDeclaration::resolve(&own, None).unwrap();
        assert_eq!(ep.sales_ledger, "Sales");
    }

    #[test]
    fn test_stock_item_name_falls_back_to_product() {
        assert_eq!(line(Some("WIDGET-ERP")).stock_item_name(), "WIDGET-ERP");
        assert_eq!(line(None).stock_item_name(), "Widget");
        assert_eq!(line(Some("  ")).stock_item_name(), "Widget");
    }
}
