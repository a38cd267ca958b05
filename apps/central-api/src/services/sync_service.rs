//! Integration endpoints polled by bridge agents.
//!
//! ## Status Updates
//! ```text
//! update-order-status        pending ──► posted_to_erp   (only direction)
//! update-price-level-status  pending_sync ──► synced     (only direction)
//!
//! A request for any other target state is a 400. Repeating a forward
//! update is a no-op that answers { "updated": false } and keeps the first
//! voucher reference.
//! ```

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use ledger_core::{
    OrderSyncState, PriceLevelSyncState, VoucherReference, DEFAULT_ORDER_BATCH,
    DEFAULT_PRICE_LEVEL_BATCH,
};
use ledger_sync::protocol::{
    CatalogImportSummary, PendingOrdersResponse, PendingPriceLevelsResponse, StatusUpdateResponse,
    SyncProductsRequest, UpdateOrderStatusRequest, UpdatePriceLevelStatusRequest,
};

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    /// Requested limit clamped to `1..=max`, `max` when absent.
    fn clamp(&self, max: u32) -> u32 {
        self.limit.unwrap_or(max).clamp(1, max)
    }
}

/// `GET /integration/pending-orders`
pub async fn pending_orders(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<PendingOrdersResponse>> {
    let orders = state
        .db
        .orders()
        .fetch_pending_for_tenant(&caller.tenant_id, query.clamp(DEFAULT_ORDER_BATCH))
        .await?;

    debug!(tenant_id = %caller.tenant_id, count = orders.len(), "Serving pending orders");
    Ok(Json(PendingOrdersResponse { orders }))
}

/// `GET /integration/pending-price-levels`
pub async fn pending_price_levels(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<PendingPriceLevelsResponse>> {
    let price_levels = state
        .db
        .price_levels()
        .fetch_pending_for_tenant(&caller.tenant_id, query.clamp(DEFAULT_PRICE_LEVEL_BATCH))
        .await?;

    debug!(tenant_id = %caller.tenant_id, count = price_levels.len(), "Serving pending price levels");
    Ok(Json(PendingPriceLevelsResponse { price_levels }))
}

/// `POST /integration/update-order-status`
///
/// The voucher number defaults to the order number and the voucher date
/// to now.
pub async fn update_order_status(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> ApiResult<Json<StatusUpdateResponse>> {
    if request.status != OrderSyncState::PostedToErp {
        return Err(ApiError::InvalidRequest(format!(
            "orders can only move to {}",
            OrderSyncState::PostedToErp.as_str()
        )));
    }

    let orders = state.db.orders();
    if !orders.belongs_to_tenant(&request.order_id, &caller.tenant_id).await? {
        return Err(ApiError::NotFound(format!("Order {}", request.order_id)));
    }
    let order = orders
        .get(&request.order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {}", request.order_id)))?;

    let voucher = VoucherReference {
        number: request
            .voucher_number
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(order.order_number),
        date: request.voucher_date.unwrap_or_else(Utc::now),
    };
    let updated = orders.mark_posted(&order.id, &voucher).await?;

    info!(
        order_id = %order.id,
        voucher = %voucher.number,
        updated,
        reported_by = %caller.account_id,
        "Order status reported by bridge"
    );
    Ok(Json(StatusUpdateResponse { updated }))
}

/// `POST /integration/update-price-level-status`
pub async fn update_price_level_status(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdatePriceLevelStatusRequest>,
) -> ApiResult<Json<StatusUpdateResponse>> {
    if request.status != PriceLevelSyncState::Synced {
        return Err(ApiError::InvalidRequest(format!(
            "price levels can only move to {}",
            PriceLevelSyncState::Synced.as_str()
        )));
    }

    let levels = state.db.price_levels();
    let level = levels
        .get(&request.id)
        .await?
        .filter(|l| l.account_id == caller.tenant_id)
        .ok_or_else(|| ApiError::NotFound(format!("Price level {}", request.id)))?;

    let updated = levels.mark_synced(&level.id).await?;

    info!(price_level_id = %level.id, name = %level.name, updated, "Price level status reported by bridge");
    Ok(Json(StatusUpdateResponse { updated }))
}

/// `POST /integration/sync-products`
pub async fn sync_products(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SyncProductsRequest>,
) -> ApiResult<Json<CatalogImportSummary>> {
    let summary = state
        .db
        .products()
        .import_catalog(&caller.tenant_id, &request.products)
        .await?;

    info!(
        tenant_id = %caller.tenant_id,
        products = summary.products,
        prices = summary.prices,
        skipped_tiers = summary.skipped_tiers,
        "Catalog imported"
    );
    Ok(Json(summary))
}
