//! # Central REST Protocol
//!
//! JSON bodies exchanged between bridge agents and the central service.
//! The central API serves these types; [`crate::source::RestSource`]
//! consumes them.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /auth/login                        LoginRequest → TokenResponse  │
//! │                                                                         │
//! │  (bearer token required below)                                         │
//! │  GET  /integration/pending-orders        → PendingOrdersResponse       │
//! │  GET  /integration/pending-price-levels  → PendingPriceLevelsResponse  │
//! │  POST /integration/update-order-status   UpdateOrderStatusRequest      │
//! │  POST /integration/update-price-level-status                           │
//! │                                          UpdatePriceLevelStatusRequest │
//! │  POST /integration/sync-products         SyncProductsRequest           │
//! │                                          → CatalogImportSummary        │
//! │                                                                         │
//! │  POST /erp/test                          ConnectionTestRequest         │
//! │  GET  /health                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money travels as integer minor units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledger_core::{CatalogProduct, OrderSyncState, PendingOrder, PriceLevel, PriceLevelSyncState};

pub use ledger_db::CatalogImportSummary;

/// Route paths, shared by the router and the client.
pub mod routes {
    pub const LOGIN: &str = "/auth/login";
    pub const PENDING_ORDERS: &str = "/integration/pending-orders";
    pub const PENDING_PRICE_LEVELS: &str = "/integration/pending-price-levels";
    pub const UPDATE_ORDER_STATUS: &str = "/integration/update-order-status";
    pub const UPDATE_PRICE_LEVEL_STATUS: &str = "/integration/update-price-level-status";
    pub const SYNC_PRODUCTS: &str = "/integration/sync-products";
    pub const ERP_TEST: &str = "/erp/test";
    pub const HEALTH: &str = "/health";
}

// =============================================================================
// Authentication
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "Bearer".
    pub token_type: String,
    /// Seconds until `access_token` expires.
    pub expires_in: u64,
}

// =============================================================================
// Discovery
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingOrdersResponse {
    pub orders: Vec<PendingOrder>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingPriceLevelsResponse {
    pub price_levels: Vec<PriceLevel>,
}

// =============================================================================
// Status Updates
// =============================================================================

/// Reports an order's outcome. Only `posted_to_erp` is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub order_id: String,
    pub status: OrderSyncState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_date: Option<DateTime<Utc>>,
}

/// Reports a price level's outcome. Only `synced` is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePriceLevelStatusRequest {
    pub id: String,
    pub status: PriceLevelSyncState,
}

/// `updated` is false when the record was already in the target state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub updated: bool,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncProductsRequest {
    pub products: Vec<CatalogProduct>,
}

// =============================================================================
// Connection Test
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestRequest {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResponse {
    pub reachable: bool,
    pub message: String,
}

// =============================================================================
// Errors
// =============================================================================

/// Body of every non-2xx response from the central service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_format() {
        let req: UpdateOrderStatusRequest = serde_json::from_str(
            r#"{"order_id":"o1","status":"posted_to_erp","voucher_number":"ORD-1-a"}"#,
        )
        .unwrap();
        assert_eq!(req.status, OrderSyncState::PostedToErp);
        assert_eq!(req.voucher_number.as_deref(), Some("ORD-1-a"));
        assert!(req.voucher_date.is_none());
    }

    #[test]
    fn test_sync_products_wire_format() {
        let req: SyncProductsRequest = serde_json::from_str(
            r#"{"products":[{"name":"Widget","stock":4.0,"price":120000,"guid":"g1",
                "prices":[{"level":"Wholesale","price":96000}]}]}"#,
        )
        .unwrap();
        let product = &req.products[0];
        assert_eq!(product.price.cents(), 120000);
        assert_eq!(product.prices[0].level, "Wholesale");
    }
}
