//! # Product Repository
//!
//! Catalog entries and their per-tier prices.
//!
//! ## Catalog Import
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How a Catalog Push Lands                             │
//! │                                                                         │
//! │  Bridge agent: POST /integration/sync-products [CatalogProduct...]     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  import_catalog(tenant, products)        ONE transaction               │
//! │       │                                                                 │
//! │       ├── Standard level ensured                                       │
//! │       ├── products upserted by (tenant, name), GUID recorded           │
//! │       └── tier prices upserted for levels the tenant has               │
//! │           (unknown tiers counted as skipped)                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use ledger_core::validation::{validate_price_cents, validate_product_name};
use ledger_core::{CatalogProduct, CoreError, Money, Product, TierPrice, STANDARD_PRICE_LEVEL};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    account_id: String,
    name: String,
    base_price_cents: i64,
    stock: f64,
    erp_guid: Option<String>,
    erp_item_name: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            account_id: row.account_id,
            name: row.name,
            base_price_cents: row.base_price_cents,
            stock: row.stock,
            erp_guid: row.erp_guid,
            erp_item_name: row.erp_item_name,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str =
    "id, account_id, name, base_price_cents, stock, erp_guid, erp_item_name, updated_at";

/// A product created by hand rather than imported from the ERP.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub account_id: String,
    pub name: String,
    pub base_price: Money,
    pub stock: f64,
}

/// What one catalog push changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogImportSummary {
    pub products: usize,
    pub prices: usize,
    /// Tier prices for levels the tenant has not defined.
    pub skipped_tiers: usize,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        let name = new.name.trim();
        validate_product_name(name).map_err(CoreError::from)?;
        validate_price_cents(new.base_price.cents()).map_err(CoreError::from)?;

        let product = Product {
            id: Uuid::new_v4().to_string(),
            account_id: new.account_id.clone(),
            name: name.to_string(),
            base_price_cents: new.base_price.cents(),
            stock: new.stock,
            erp_guid: None,
            erp_item_name: None,
            updated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO products (id, account_id, name, base_price_cents, stock, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.account_id)
        .bind(&product.name)
        .bind(product.base_price_cents)
        .bind(product.stock)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("product", &product.name),
            other => other,
        })?;

        debug!(product_id = %product.id, name = %product.name, "Product inserted");
        Ok(product)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// All products of a tenant, by name.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products WHERE account_id = ?1 ORDER BY name ASC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Inserts or updates one catalog product keyed by (tenant, name).
    pub async fn upsert(&self, tenant_id: &str, item: &CatalogProduct) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        upsert_product(&mut conn, tenant_id, item).await
    }

    /// Sets the price of a product under one level, replacing any earlier one.
    pub async fn upsert_price(
        &self,
        product_id: &str,
        price_level_id: &str,
        price: Money,
    ) -> DbResult<()> {
        validate_price_cents(price.cents()).map_err(CoreError::from)?;
        let mut conn = self.pool.acquire().await?;
        upsert_price(&mut conn, product_id, price_level_id, price).await
    }

    /// Tier prices of a product, by level name.
    pub async fn prices(&self, product_id: &str) -> DbResult<Vec<TierPrice>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT pl.name, pp.price_cents
            FROM product_prices pp
            JOIN price_levels pl ON pl.id = pp.price_level_id
            WHERE pp.product_id = ?1
            ORDER BY pl.is_standard DESC, pl.name ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(level, cents)| TierPrice {
                level,
                price: Money::from_cents(cents),
            })
            .collect())
    }

    /// Applies a catalog push for one tenant atomically.
    ///
    /// Products are upserted by name. Each tier price is stored against the
    /// tenant's level of that name; tiers the tenant has not defined are
    /// counted in `skipped_tiers`. The Standard level is created if missing.
    pub async fn import_catalog(
        &self,
        tenant_id: &str,
        items: &[CatalogProduct],
    ) -> DbResult<CatalogImportSummary> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO price_levels (id, account_id, name, is_standard, sync_state, created_at)
            VALUES (?1, ?2, ?3, 1, 'local', ?4)
            ON CONFLICT (account_id, name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(tenant_id)
        .bind(STANDARD_PRICE_LEVEL)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let levels: Vec<(String, String)> =
            sqlx::query_as("SELECT name, id FROM price_levels WHERE account_id = ?1")
                .bind(tenant_id)
                .fetch_all(&mut *tx)
                .await?;
        let levels: HashMap<String, String> = levels
            .into_iter()
            .map(|(name, id)| (name.to_lowercase(), id))
            .collect();

        let mut summary = CatalogImportSummary::default();
        for item in items {
            let product = upsert_product(&mut tx, tenant_id, item).await?;
            summary.products += 1;

            for tier in &item.prices {
                match levels.get(&tier.level.to_lowercase()) {
                    Some(level_id) => {
                        upsert_price(&mut tx, &product.id, level_id, tier.price).await?;
                        summary.prices += 1;
                    }
                    None => summary.skipped_tiers += 1,
                }
            }
        }

        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            products = summary.products,
            prices = summary.prices,
            skipped_tiers = summary.skipped_tiers,
            "Catalog imported"
        );
        Ok(summary)
    }
}

async fn upsert_product(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    item: &CatalogProduct,
) -> DbResult<Product> {
    let name = item.name.trim();
    validate_product_name(name).map_err(CoreError::from)?;
    let guid = Some(item.guid.trim()).filter(|g| !g.is_empty());

    let row = sqlx::query_as::<_, ProductRow>(&format!(
        r#"
        INSERT INTO products (
            id, account_id, name, base_price_cents, stock,
            erp_guid, erp_item_name, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?3, ?7)
        ON CONFLICT (account_id, name) DO UPDATE SET
            base_price_cents = excluded.base_price_cents,
            stock = excluded.stock,
            erp_guid = COALESCE(excluded.erp_guid, products.erp_guid),
            erp_item_name = excluded.erp_item_name,
            updated_at = excluded.updated_at
        RETURNING {COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(tenant_id)
    .bind(name)
    .bind(item.price.cents().max(0))
    .bind(item.stock)
    .bind(guid)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

async fn upsert_price(
    conn: &mut SqliteConnection,
    product_id: &str,
    price_level_id: &str,
    price: Money,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO product_prices (product_id, price_level_id, price_cents)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (product_id, price_level_id) DO UPDATE SET
            price_cents = excluded.price_cents
        "#,
    )
    .bind(product_id)
    .bind(price_level_id)
    .bind(price.cents().max(0))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
