//! # Work Sources
//!
//! Where the engine reads pending work from and reports outcomes to.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Two Vantage Points                              │
//! │                                                                         │
//! │  CENTRAL                                BRIDGE                         │
//! │  ┌─────────────┐                        ┌─────────────┐                │
//! │  │ StoreSource │── SQLite directly      │ RestSource  │── bearer REST  │
//! │  └─────────────┘   (all tenants)        └─────────────┘   (one tenant) │
//! │         │                                      │                        │
//! │         └──────────────┬───────────────────────┘                        │
//! │                        ▼                                                │
//! │                  SyncEngine (same rules either way)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::auth::AuthSession;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{
    routes, CatalogImportSummary, ErrorBody, PendingOrdersResponse, PendingPriceLevelsResponse,
    StatusUpdateResponse, SyncProductsRequest, UpdateOrderStatusRequest,
    UpdatePriceLevelStatusRequest,
};
use ledger_core::{
    CatalogProduct, OrderSyncState, PendingOrder, PriceLevel, PriceLevelSyncState,
    VoucherReference,
};
use ledger_db::Database;

/// Pending work plus the two targeted state updates.
///
/// Both marks are idempotent: marking an already-posted order or an
/// already-synced level is a no-op that returns `Ok(false)`.
#[async_trait]
pub trait WorkSource: Send + Sync {
    async fn pending_orders(&self, limit: u32) -> SyncResult<Vec<PendingOrder>>;

    async fn pending_price_levels(&self, limit: u32) -> SyncResult<Vec<PriceLevel>>;

    async fn mark_order_posted(&self, order_id: &str, voucher: &VoucherReference)
        -> SyncResult<bool>;

    async fn mark_price_level_synced(&self, id: &str) -> SyncResult<bool>;
}

// =============================================================================
// Store Source (central)
// =============================================================================

/// Reads and writes the reconciliation store directly.
#[derive(Debug, Clone)]
pub struct StoreSource {
    db: Database,
}

impl StoreSource {
    pub fn new(db: Database) -> Self {
        StoreSource { db }
    }
}

#[async_trait]
impl WorkSource for StoreSource {
    async fn pending_orders(&self, limit: u32) -> SyncResult<Vec<PendingOrder>> {
        Ok(self.db.orders().fetch_pending(limit).await?)
    }

    async fn pending_price_levels(&self, limit: u32) -> SyncResult<Vec<PriceLevel>> {
        Ok(self.db.price_levels().fetch_pending(limit).await?)
    }

    async fn mark_order_posted(
        &self,
        order_id: &str,
        voucher: &VoucherReference,
    ) -> SyncResult<bool> {
        Ok(self.db.orders().mark_posted(order_id, voucher).await?)
    }

    async fn mark_price_level_synced(&self, id: &str) -> SyncResult<bool> {
        Ok(self.db.price_levels().mark_synced(id).await?)
    }
}

// =============================================================================
// REST Source (bridge)
// =============================================================================

/// Talks to the central polling REST surface as an authenticated client.
#[derive(Debug, Clone)]
pub struct RestSource {
    http: reqwest::Client,
    session: Arc<AuthSession>,
}

impl RestSource {
    pub fn new(http: reqwest::Client, session: Arc<AuthSession>) -> Self {
        RestSource { http, session }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Pushes the terminal's catalog to the central service.
    pub async fn push_catalog(&self, products: Vec<CatalogProduct>) -> SyncResult<CatalogImportSummary> {
        self.post(routes::SYNC_PRODUCTS, &SyncProductsRequest { products })
            .await
    }

    async fn get<T: DeserializeOwned>(&self, route: &str, limit: u32) -> SyncResult<T> {
        let url = format!("{}{}", self.session.base_url(), route);
        let token = self.session.bearer().await?;
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", limit)])
            .send()
            .await?;
        self.decode(route, response).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        route: &str,
        body: &B,
    ) -> SyncResult<T> {
        let url = format!("{}{}", self.session.base_url(), route);
        let token = self.session.bearer().await?;
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        self.decode(route, response).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        route: &str,
        response: reqwest::Response,
    ) -> SyncResult<T> {
        let status = response.status();
        debug!(route, %status, "Central service answered");

        if status == StatusCode::UNAUTHORIZED {
            self.session.invalidate().await;
            return Err(SyncError::AuthenticationFailed(format!(
                "{route} rejected the bearer token"
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);
            return Err(SyncError::CentralRejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl WorkSource for RestSource {
    async fn pending_orders(&self, limit: u32) -> SyncResult<Vec<PendingOrder>> {
        let body: PendingOrdersResponse = self.get(routes::PENDING_ORDERS, limit).await?;
        Ok(body.orders)
    }

    async fn pending_price_levels(&self, limit: u32) -> SyncResult<Vec<PriceLevel>> {
        let body: PendingPriceLevelsResponse =
            self.get(routes::PENDING_PRICE_LEVELS, limit).await?;
        Ok(body.price_levels)
    }

    async fn mark_order_posted(
        &self,
        order_id: &str,
        voucher: &VoucherReference,
    ) -> SyncResult<bool> {
        let body: StatusUpdateResponse = self
            .post(
                routes::UPDATE_ORDER_STATUS,
                &UpdateOrderStatusRequest {
                    order_id: order_id.to_string(),
                    status: OrderSyncState::PostedToErp,
                    voucher_number: Some(voucher.number.clone()),
                    voucher_date: Some(voucher.date),
                },
            )
            .await?;
        Ok(body.updated)
    }

    async fn mark_price_level_synced(&self, id: &str) -> SyncResult<bool> {
        let body: StatusUpdateResponse = self
            .post(
                routes::UPDATE_PRICE_LEVEL_STATUS,
                &UpdatePriceLevelStatusRequest {
                    id: id.to_string(),
                    status: PriceLevelSyncState::Synced,
                },
            )
            .await?;
        Ok(body.updated)
    }
}
