//! # Inbound Catalog
//!
//! Terminal stock items → central catalog, run by the bridge agent.
//!
//! ```text
//! ERP terminal                 bridge                          central
//! ────────────                 ──────                          ───────
//!   ◄── stock export request
//!   ──► STOCKITEM blocks ──► parse_stock_items
//!                            + synthesized tiers ──► POST sync-products
//!                              (Standard ×1.0,                 upsert by name
//!                               Wholesale ×0.8,
//!                               Retail ×1.2)
//! ```
//!
//! The terminal does not export true multi-tier prices, so every tier is
//! derived from the item's single rate.

use tracing::{debug, info};

use crate::client::SyncClient;
use crate::error::SyncResult;
use crate::protocol::CatalogImportSummary;
use crate::source::RestSource;
use ledger_core::codec::{build_stock_export_request, parse_stock_items};
use ledger_core::pricing::synthesize_tier_prices;
use ledger_core::{CatalogProduct, StockItem, TenantEndpoint};

/// Requests and decodes the terminal's inventory masters.
pub async fn fetch_stock_items(
    client: &SyncClient,
    endpoint: &TenantEndpoint,
) -> SyncResult<Vec<StockItem>> {
    let body = client.send(&build_stock_export_request(), endpoint).await?;
    let items = parse_stock_items(&body);
    debug!(count = items.len(), endpoint = %endpoint.url(), "Stock items decoded");
    Ok(items)
}

/// Stock items as catalog products with synthesized tier prices.
pub fn to_catalog(items: Vec<StockItem>) -> Vec<CatalogProduct> {
    items
        .into_iter()
        .map(|item| CatalogProduct {
            prices: synthesize_tier_prices(item.price),
            name: item.name,
            stock: item.stock,
            price: item.price,
            guid: item.external_id,
        })
        .collect()
}

/// One terminal's catalog, pushed to the central service.
pub struct CatalogPipeline {
    client: SyncClient,
    terminal: TenantEndpoint,
    central: RestSource,
}

impl CatalogPipeline {
    pub fn new(client: SyncClient, terminal: TenantEndpoint, central: RestSource) -> Self {
        CatalogPipeline {
            client,
            terminal,
            central,
        }
    }

    /// Exports, converts, and pushes. An export with no items pushes
    /// nothing.
    pub async fn run_once(&self) -> SyncResult<CatalogImportSummary> {
        let items = fetch_stock_items(&self.client, &self.terminal).await?;
        if items.is_empty() {
            debug!("Terminal exported no stock items, nothing to push");
            return Ok(CatalogImportSummary::default());
        }

        let summary = self.central.push_catalog(to_catalog(items)).await?;
        info!(
            products = summary.products,
            prices = summary.prices,
            skipped_tiers = summary.skipped_tiers,
            "Catalog pushed to central service"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::Money;

    #[test]
    fn test_to_catalog_synthesizes_tiers() {
        let catalog = to_catalog(vec![StockItem {
            name: "Widget".into(),
            stock: 4.0,
            price: Money::from_cents(120000),
            external_id: "guid-1".into(),
        }]);

        assert_eq!(catalog.len(), 1);
        let product = &catalog[0];
        assert_eq!(product.guid, "guid-1");
        assert_eq!(product.price, Money::from_cents(120000));

        let tiers: Vec<(&str, i64)> = product
            .prices
            .iter()
            .map(|t| (t.level.as_str(), t.price.cents()))
            .collect();
        assert_eq!(
            tiers,
            vec![("Standard", 120000), ("Wholesale", 96000), ("Retail", 144000)]
        );
    }
}
