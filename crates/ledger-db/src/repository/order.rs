//! # Order Repository
//!
//! Orders and their lines, from checkout to posted voucher.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CHECKOUT                                                           │
//! │     └── create() → rates snapshotted, sync_state = pending             │
//! │                                                                         │
//! │  2. DISCOVERY (every cycle)                                            │
//! │     └── fetch_pending(50) → oldest first, tenants with an endpoint     │
//! │     └── lines for the whole batch in ONE query                         │
//! │                                                                         │
//! │  3. RECONCILE                                                          │
//! │     └── mark_posted(id, voucher) → posted_to_erp (exactly once)        │
//! │     └── failure: nothing written, next cycle retries                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{HAS_ENDPOINT, IN_TENANT};
use ledger_core::pricing::{effective_tier, OrderTotals, PricedLine};
use ledger_core::validation::validate_new_order;
use ledger_core::{
    CoreError, Money, NewOrder, Order, OrderLine, OrderSyncState, PendingOrder, VoucherReference,
};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    account_id: String,
    order_number: String,
    customer_name: String,
    order_date: DateTime<Utc>,
    price_level: Option<String>,
    payment_mode: Option<String>,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    sync_state: OrderSyncState,
    voucher_number: Option<String>,
    voucher_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            account_id: row.account_id,
            order_number: row.order_number,
            customer_name: row.customer_name,
            order_date: row.order_date,
            price_level: row.price_level,
            payment_mode: row.payment_mode,
            subtotal_cents: row.subtotal_cents,
            tax_cents: row.tax_cents,
            total_cents: row.total_cents,
            sync_state: row.sync_state,
            voucher_number: row.voucher_number,
            voucher_date: row.voucher_date,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PendingRow {
    #[sqlx(flatten)]
    order: OrderRow,
    sales_ledger: Option<String>,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    id: String,
    order_id: String,
    product_id: String,
    product_name: String,
    erp_item_name: Option<String>,
    quantity: i64,
    rate_cents: i64,
    amount_cents: i64,
    tax_rate_bps: i64,
}

impl From<LineRow> for OrderLine {
    fn from(row: LineRow) -> Self {
        OrderLine {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            erp_item_name: row.erp_item_name,
            quantity: row.quantity,
            rate_cents: row.rate_cents,
            amount_cents: row.amount_cents,
            tax_rate_bps: u32::try_from(row.tax_rate_bps).unwrap_or(0),
        }
    }
}

const ORDER_COLUMNS: &str = "o.id, o.account_id, o.order_number, o.customer_name, o.order_date,
    o.price_level, o.payment_mode, o.subtotal_cents, o.tax_cents, o.total_cents,
    o.sync_state, o.voucher_number, o.voucher_date, o.created_at";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Pending orders across ALL tenants whose endpoint resolves, oldest
    /// first, with lines pre-joined.
    ///
    /// Anything beyond `limit` stays pending and is picked up by a later
    /// cycle in the same oldest-first order.
    pub async fn fetch_pending(&self, limit: u32) -> DbResult<Vec<PendingOrder>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS},
                   COALESCE(NULLIF(TRIM(a.sales_ledger), ''), NULLIF(TRIM(p.sales_ledger), '')) AS sales_ledger
            FROM orders o
            JOIN accounts a ON a.id = o.account_id
            LEFT JOIN accounts p ON p.id = a.parent_id
            WHERE o.sync_state = 'pending'
              AND {HAS_ENDPOINT}
            ORDER BY o.created_at ASC, o.rowid ASC
            LIMIT ?1
            "#
        );

        let rows = sqlx::query_as::<_, PendingRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), limit, "Discovered pending orders");
        self.attach_lines(rows).await
    }

    /// Pending orders for one tenant (the tenant account and its
    /// employees), oldest first. Used by the REST surface bridge agents
    /// poll; endpoint declarations are irrelevant there.
    pub async fn fetch_pending_for_tenant(
        &self,
        tenant_id: &str,
        limit: u32,
    ) -> DbResult<Vec<PendingOrder>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS},
                   COALESCE(NULLIF(TRIM(a.sales_ledger), ''), NULLIF(TRIM(p.sales_ledger), '')) AS sales_ledger
            FROM orders o
            JOIN accounts a ON a.id = o.account_id
            LEFT JOIN accounts p ON p.id = a.parent_id
            WHERE o.sync_state = 'pending'
              AND {IN_TENANT}
            ORDER BY o.created_at ASC, o.rowid ASC
            LIMIT ?
            "#
        );

        let rows = sqlx::query_as::<_, PendingRow>(&sql)
            .bind(tenant_id)
            .bind(tenant_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(tenant_id = %tenant_id, count = rows.len(), "Discovered tenant pending orders");
        self.attach_lines(rows).await
    }

    async fn attach_lines(&self, rows: Vec<PendingRow>) -> DbResult<Vec<PendingOrder>> {
        let ids: Vec<&str> = rows.iter().map(|r| r.order.id.as_str()).collect();
        let mut lines = self.lines_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let order: Order = row.order.into();
                PendingOrder {
                    lines: lines.remove(&order.id).unwrap_or_default(),
                    order,
                    sales_ledger: row.sales_ledger,
                }
            })
            .collect())
    }

    /// Loads the lines of many orders with a single `IN (...)` query.
    async fn lines_for(&self, order_ids: &[&str]) -> DbResult<HashMap<String, Vec<OrderLine>>> {
        let mut by_order: HashMap<String, Vec<OrderLine>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(by_order);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT l.id, l.order_id, l.product_id, l.product_name,
                   pr.erp_item_name, l.quantity, l.rate_cents, l.amount_cents, l.tax_rate_bps
            FROM order_lines l
            LEFT JOIN products pr ON pr.id = l.product_id
            WHERE l.order_id IN ("#,
        );
        let mut separated = qb.separated(", ");
        for id in order_ids {
            separated.push_bind(*id);
        }
        qb.push(") ORDER BY l.order_id, l.line_no");

        let rows: Vec<LineRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        for row in rows {
            by_order
                .entry(row.order_id.clone())
                .or_default()
                .push(row.into());
        }
        Ok(by_order)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    pub async fn lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        Ok(self
            .lines_for(&[order_id])
            .await?
            .remove(order_id)
            .unwrap_or_default())
    }

    /// Whether `order_id` belongs to `tenant_id` (the tenant or an employee).
    pub async fn belongs_to_tenant(&self, order_id: &str, tenant_id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT 1 FROM orders o JOIN accounts a ON a.id = o.account_id
             WHERE o.id = ? AND {IN_TENANT}"
        ))
        .bind(order_id)
        .bind(tenant_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Marks an order posted and records its voucher reference.
    ///
    /// ## Returns
    /// * `Ok(true)` - the order moved Pending → PostedToErp
    /// * `Ok(false)` - it was already posted; the first reference is kept
    /// * `Err(NotFound)` - no such order
    pub async fn mark_posted(&self, id: &str, voucher: &VoucherReference) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                sync_state = 'posted_to_erp',
                voucher_number = ?2,
                voucher_date = ?3
            WHERE id = ?1 AND sync_state = 'pending'
            "#,
        )
        .bind(id)
        .bind(&voucher.number)
        .bind(voucher.date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            debug!(order_id = %id, voucher = %voucher.number, "Order posted");
            return Ok(true);
        }

        match self.get(id).await? {
            Some(_) => {
                debug!(order_id = %id, "Order already posted, keeping first voucher reference");
                Ok(false)
            }
            None => Err(DbError::not_found("Order", id)),
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Creates an order with rates snapshotted from the catalog.
    ///
    /// ## What This Does
    /// 1. Validates the payload
    /// 2. For each line, loads the product from the account's tenant and
    ///    resolves its rate for the order's tier (base price if the product
    ///    has no price for that tier)
    /// 3. Computes amounts, tax, and totals
    /// 4. Inserts order + lines in one transaction as Pending, numbered
    ///    `ORD-<millis>-<account>`
    pub async fn create(&self, new: &NewOrder) -> DbResult<(Order, Vec<OrderLine>)> {
        validate_new_order(new).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let tenant_id: Option<String> = sqlx::query_scalar(
            "SELECT COALESCE(parent_id, id) FROM accounts WHERE id = ?1",
        )
        .bind(&new.account_id)
        .fetch_optional(&mut *tx)
        .await?;
        let tenant_id = tenant_id.ok_or_else(|| DbError::not_found("Account", &new.account_id))?;

        let tier = effective_tier(new.price_level.as_deref()).to_string();
        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();

        let mut priced = Vec::with_capacity(new.lines.len());
        let mut lines = Vec::with_capacity(new.lines.len());
        for line in &new.lines {
            let (name, erp_item_name, rate) =
                price_line(&mut tx, &tenant_id, &line.product_id, &tier).await?;
            let p = PricedLine::new(line, rate);
            lines.push(OrderLine {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                product_name: name,
                erp_item_name,
                quantity: p.quantity,
                rate_cents: p.rate.cents(),
                amount_cents: p.amount.cents(),
                tax_rate_bps: p.tax_rate.bps(),
            });
            priced.push(p);
        }
        let totals = OrderTotals::compute(&priced);

        let order_number = next_order_number(&mut tx, &new.account_id, now).await?;
        let order = Order {
            id: order_id,
            account_id: new.account_id.clone(),
            order_number,
            customer_name: new.customer_name.trim().to_string(),
            order_date: now,
            price_level: Some(tier),
            payment_mode: new.payment_mode.clone(),
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            sync_state: OrderSyncState::Pending,
            voucher_number: None,
            voucher_date: None,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, account_id, order_number, customer_name, order_date,
                price_level, payment_mode, subtotal_cents, tax_cents, total_cents,
                sync_state, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&order.id)
        .bind(&order.account_id)
        .bind(&order.order_number)
        .bind(&order.customer_name)
        .bind(order.order_date)
        .bind(&order.price_level)
        .bind(&order.payment_mode)
        .bind(order.subtotal_cents)
        .bind(order.tax_cents)
        .bind(order.total_cents)
        .bind(order.sync_state)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for (line_no, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    id, order_id, line_no, product_id, product_name,
                    quantity, rate_cents, amount_cents, tax_rate_bps
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&line.id)
            .bind(&line.order_id)
            .bind(line_no as i64)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.rate_cents)
            .bind(line.amount_cents)
            .bind(i64::from(line.tax_rate_bps))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %Money::from_cents(order.total_cents),
            "Order created"
        );
        Ok((order, lines))
    }
}

/// Resolves `(product name, erp item name, unit rate)` for one line.
async fn price_line(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    product_id: &str,
    tier: &str,
) -> DbResult<(String, Option<String>, Money)> {
    #[derive(sqlx::FromRow)]
    struct Row {
        name: String,
        erp_item_name: Option<String>,
        base_price_cents: i64,
        tier_price_cents: Option<i64>,
    }

    let row = sqlx::query_as::<_, Row>(
        r#"
        SELECT pr.name, pr.erp_item_name, pr.base_price_cents,
               pp.price_cents AS tier_price_cents
        FROM products pr
        LEFT JOIN price_levels pl
               ON pl.account_id = pr.account_id AND pl.name = ?3 COLLATE NOCASE
        LEFT JOIN product_prices pp
               ON pp.product_id = pr.id AND pp.price_level_id = pl.id
        WHERE pr.id = ?1 AND pr.account_id = ?2
        "#,
    )
    .bind(product_id)
    .bind(tenant_id)
    .bind(tier)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

    let rate = Money::from_cents(row.tier_price_cents.unwrap_or(row.base_price_cents));
    Ok((row.name, row.erp_item_name, rate))
}

/// `ORD-<millis>-<account>`, bumped past any number already taken.
async fn next_order_number(
    conn: &mut SqliteConnection,
    account_id: &str,
    now: DateTime<Utc>,
) -> DbResult<String> {
    let mut millis = now.timestamp_millis();
    loop {
        let candidate = format!("ORD-{millis}-{account_id}");
        let taken: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE order_number = ?1")
            .bind(&candidate)
            .fetch_optional(&mut *conn)
            .await?;
        if taken.is_none() {
            return Ok(candidate);
        }
        millis += 1;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, employee, product, tenant};
    use crate::Database;
    use ledger_core::{NewOrderLine, TaxRate};

    fn new_order(account_id: &str, lines: Vec<(&str, i64)>) -> NewOrder {
        NewOrder {
            account_id: account_id.to_string(),
            customer_name: "Walk-in".to_string(),
            price_level: None,
            payment_mode: Some("Cash".to_string()),
            lines: lines
                .into_iter()
                .map(|(product_id, quantity)| NewOrderLine {
                    product_id: product_id.to_string(),
                    quantity,
                    tax_rate: TaxRate::zero(),
                })
                .collect(),
        }
    }

    async fn seeded() -> (Database, ledger_core::Account, ledger_core::Product) {
        let db = db().await;
        let t = tenant(&db, "acme", Some(("erp.local", 9000))).await;
        let p = product(&db, &t, "Widget", 10000).await;
        (db, t, p)
    }

    #[tokio::test]
    async fn test_create_snapshots_rates() {
        let (db, t, widget) = seeded().await;
        let gadget = product(&db, &t, "Gadget", 5000).await;

        let (order, lines) = db
            .orders()
            .create(&new_order(&t.id, vec![(&widget.id, 3), (&gadget.id, 1)]))
            .await
            .unwrap();

        assert_eq!(order.sync_state, OrderSyncState::Pending);
        assert!(order.order_number.starts_with("ORD-"));
        assert!(order.order_number.ends_with(&t.id));
        assert_eq!(order.price_level.as_deref(), Some("Standard"));
        assert_eq!(order.total_cents, 35000);
        assert_eq!(lines[0].amount_cents, 30000);
        assert_eq!(lines[1].amount_cents, 5000);

        // Later price changes do not touch the snapshot
        sqlx::query("UPDATE products SET base_price_cents = 1")
            .execute(db.pool())
            .await
            .unwrap();
        let stored = db.orders().lines(&order.id).await.unwrap();
        assert_eq!(stored[0].rate_cents, 10000);
        assert_eq!(stored[1].rate_cents, 5000);
    }

    #[tokio::test]
    async fn test_create_uses_tier_price() {
        let (db, t, widget) = seeded().await;
        let wholesale = db
            .price_levels()
            .create(&t.id, "Wholesale", false)
            .await
            .unwrap();
        db.products()
            .upsert_price(&widget.id, &wholesale.id, Money::from_cents(8000))
            .await
            .unwrap();

        let mut req = new_order(&t.id, vec![(&widget.id, 2)]);
        req.price_level = Some("Wholesale".into());
        let (order, lines) = db.orders().create(&req).await.unwrap();

        assert_eq!(lines[0].rate_cents, 8000);
        assert_eq!(order.subtotal_cents, 16000);
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_product() {
        let (db, _t, widget) = seeded().await;
        let other = tenant(&db, "other", None).await;

        let err = db
            .orders()
            .create(&new_order(&other.id, vec![(&widget.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_order_numbers_are_unique() {
        let (db, t, widget) = seeded().await;
        let mut numbers = std::collections::HashSet::new();
        for _ in 0..5 {
            let (order, _) = db
                .orders()
                .create(&new_order(&t.id, vec![(&widget.id, 1)]))
                .await
                .unwrap();
            assert!(numbers.insert(order.order_number));
        }
    }

    #[tokio::test]
    async fn test_fetch_pending_skips_tenants_without_endpoint() {
        let (db, t, widget) = seeded().await;
        let clerk = employee(&db, &t, "clerk").await;
        let orphan = tenant(&db, "no-erp", None).await;
        let orphan_product = product(&db, &orphan, "Thing", 100).await;

        db.orders().create(&new_order(&clerk.id, vec![(&widget.id, 1)])).await.unwrap();
        db.orders()
            .create(&new_order(&orphan.id, vec![(&orphan_product.id, 1)]))
            .await
            .unwrap();

        let pending = db.orders().fetch_pending(50).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order.account_id, clerk.id);
        assert_eq!(pending[0].lines.len(), 1);

        // The tenant-scoped view ignores endpoints
        let scoped = db.orders().fetch_pending_for_tenant(&orphan.id, 50).await.unwrap();
        assert_eq!(scoped.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_limit_leaves_overflow_for_next_cycle() {
        let (db, t, widget) = seeded().await;
        let mut created = Vec::new();
        for _ in 0..51 {
            let (order, _) = db
                .orders()
                .create(&new_order(&t.id, vec![(&widget.id, 1)]))
                .await
                .unwrap();
            created.push(order.id);
        }

        let first = db.orders().fetch_pending(50).await.unwrap();
        assert_eq!(first.len(), 50);
        let first_ids: Vec<_> = first.iter().map(|p| p.order.id.clone()).collect();
        assert_eq!(first_ids, created[..50]);

        let voucher = VoucherReference {
            number: "V".into(),
            date: Utc::now(),
        };
        for id in &first_ids {
            db.orders().mark_posted(id, &voucher).await.unwrap();
        }

        let second = db.orders().fetch_pending(50).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].order.id, created[50]);
    }

    #[tokio::test]
    async fn test_mark_posted_is_idempotent() {
        let (db, t, widget) = seeded().await;
        let (order, _) = db
            .orders()
            .create(&new_order(&t.id, vec![(&widget.id, 1)]))
            .await
            .unwrap();

        let first = VoucherReference {
            number: order.order_number.clone(),
            date: Utc::now(),
        };
        assert!(db.orders().mark_posted(&order.id, &first).await.unwrap());

        let second = VoucherReference {
            number: "OTHER".into(),
            date: Utc::now(),
        };
        assert!(!db.orders().mark_posted(&order.id, &second).await.unwrap());

        let stored = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.sync_state, OrderSyncState::PostedToErp);
        assert_eq!(stored.voucher_number.as_deref(), Some(order.order_number.as_str()));

        assert!(matches!(
            db.orders().mark_posted("missing", &first).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_belongs_to_tenant() {
        let (db, t, widget) = seeded().await;
        let clerk = employee(&db, &t, "clerk").await;
        let other = tenant(&db, "other", None).await;
        let (order, _) = db
            .orders()
            .create(&new_order(&clerk.id, vec![(&widget.id, 1)]))
            .await
            .unwrap();

        assert!(db.orders().belongs_to_tenant(&order.id, &t.id).await.unwrap());
        assert!(!db.orders().belongs_to_tenant(&order.id, &other.id).await.unwrap());
    }
}
