//! HTTP handlers for the central REST surface.
//!
//! ```text
//! POST /auth/login                              auth_service::login
//! GET  /integration/pending-orders              sync_service::pending_orders
//! GET  /integration/pending-price-levels        sync_service::pending_price_levels
//! POST /integration/update-order-status         sync_service::update_order_status
//! POST /integration/update-price-level-status   sync_service::update_price_level_status
//! POST /integration/sync-products               sync_service::sync_products
//! POST /erp/test                                erp_service::test_connection
//! GET  /health                                  health_service::health
//! ```
//!
//! Everything except login and health requires a bearer token, and every
//! read or write is confined to the caller's tenant.

pub mod auth_service;
pub mod erp_service;
pub mod health_service;
pub mod sync_service;
