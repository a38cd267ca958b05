//! # Price Level Repository
//!
//! Named pricing tiers per tenant. A level created with "sync to ERP"
//! starts `pending_sync` and is picked up by the scheduler; the system
//! Standard level is always `local`.
//!
//! ```text
//! create(.., sync_to_erp = true)  ──► pending_sync ──mark_synced──► synced
//! create(.., sync_to_erp = false) ──► local (never leaves)
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{HAS_ENDPOINT, IN_TENANT};
use ledger_core::validation::validate_price_level_name;
use ledger_core::{CoreError, PriceLevel, PriceLevelSyncState, STANDARD_PRICE_LEVEL};

#[derive(sqlx::FromRow)]
struct PriceLevelRow {
    id: String,
    account_id: String,
    name: String,
    is_standard: bool,
    sync_state: PriceLevelSyncState,
    created_at: DateTime<Utc>,
}

impl From<PriceLevelRow> for PriceLevel {
    fn from(row: PriceLevelRow) -> Self {
        PriceLevel {
            id: row.id,
            account_id: row.account_id,
            name: row.name,
            is_standard: row.is_standard,
            sync_state: row.sync_state,
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str = "l.id, l.account_id, l.name, l.is_standard, l.sync_state, l.created_at";

#[derive(Debug, Clone)]
pub struct PriceLevelRepository {
    pool: SqlitePool,
}

impl PriceLevelRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PriceLevelRepository { pool }
    }

    /// Returns the tenant's Standard level, creating it on first use.
    pub async fn ensure_standard(&self, tenant_id: &str) -> DbResult<PriceLevel> {
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
        .execute(&self.pool)
        .await?;

        self.find_by_name(tenant_id, STANDARD_PRICE_LEVEL)
            .await?
            .ok_or_else(|| DbError::Internal(format!("Standard level missing for {tenant_id}")))
    }

    /// Creates a named level for a tenant.
    ///
    /// ## Errors
    /// * `Domain(StandardPriceLevelImmutable)` - the name is "Standard"
    /// * `UniqueViolation` - the tenant already has a level with this name
    pub async fn create(
        &self,
        tenant_id: &str,
        name: &str,
        sync_to_erp: bool,
    ) -> DbResult<PriceLevel> {
        let name = name.trim();
        validate_price_level_name(name).map_err(CoreError::from)?;
        if name.eq_ignore_ascii_case(STANDARD_PRICE_LEVEL) {
            return Err(CoreError::StandardPriceLevelImmutable.into());
        }

        let level = PriceLevel {
            id: Uuid::new_v4().to_string(),
            account_id: tenant_id.to_string(),
            name: name.to_string(),
            is_standard: false,
            sync_state: if sync_to_erp {
                PriceLevelSyncState::PendingSync
            } else {
                PriceLevelSyncState::Local
            },
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO price_levels (id, account_id, name, is_standard, sync_state, created_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?5)
            "#,
        )
        .bind(&level.id)
        .bind(&level.account_id)
        .bind(&level.name)
        .bind(level.sync_state)
        .bind(level.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("price level", &level.name),
            other => other,
        })?;

        info!(
            price_level_id = %level.id,
            name = %level.name,
            sync_state = level.sync_state.as_str(),
            "Price level created"
        );
        Ok(level)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<PriceLevel>> {
        let row = sqlx::query_as::<_, PriceLevelRow>(&format!(
            "SELECT {COLUMNS} FROM price_levels l WHERE l.id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PriceLevel::from))
    }

    pub async fn find_by_name(&self, tenant_id: &str, name: &str) -> DbResult<Option<PriceLevel>> {
        let row = sqlx::query_as::<_, PriceLevelRow>(&format!(
            "SELECT {COLUMNS} FROM price_levels l
             WHERE l.account_id = ?1 AND l.name = ?2 COLLATE NOCASE"
        ))
        .bind(tenant_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PriceLevel::from))
    }

    /// All levels of a tenant, Standard first.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<PriceLevel>> {
        let rows = sqlx::query_as::<_, PriceLevelRow>(&format!(
            "SELECT {COLUMNS} FROM price_levels l
             WHERE l.account_id = ?1
             ORDER BY l.is_standard DESC, l.name ASC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PriceLevel::from).collect())
    }

    /// Deletes a level and its product prices. Standard cannot be deleted.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let level = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("PriceLevel", id))?;
        if level.is_standard {
            return Err(DbError::invalid_state(
                "PriceLevel",
                id,
                "the Standard price level cannot be deleted",
            ));
        }

        sqlx::query("DELETE FROM price_levels WHERE id = ?1 AND is_standard = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(price_level_id = %id, "Price level deleted");
        Ok(())
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Levels awaiting ERP creation, oldest first, restricted to tenants
    /// that declare an endpoint.
    pub async fn fetch_pending(&self, limit: u32) -> DbResult<Vec<PriceLevel>> {
        let rows = sqlx::query_as::<_, PriceLevelRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM price_levels l
            JOIN accounts a ON a.id = l.account_id
            LEFT JOIN accounts p ON p.id = a.parent_id
            WHERE l.sync_state = 'pending_sync'
              AND {HAS_ENDPOINT}
            ORDER BY l.created_at ASC, l.rowid ASC
            LIMIT ?1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), limit, "Discovered pending price levels");
        Ok(rows.into_iter().map(PriceLevel::from).collect())
    }

    pub async fn fetch_pending_for_tenant(
        &self,
        tenant_id: &str,
        limit: u32,
    ) -> DbResult<Vec<PriceLevel>> {
        let rows = sqlx::query_as::<_, PriceLevelRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM price_levels l
            JOIN accounts a ON a.id = l.account_id
            WHERE l.sync_state = 'pending_sync'
              AND {IN_TENANT}
            ORDER BY l.created_at ASC, l.rowid ASC
            LIMIT ?
            "#
        ))
        .bind(tenant_id)
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PriceLevel::from).collect())
    }

    /// Marks a level synced.
    ///
    /// ## Returns
    /// * `Ok(true)` - moved PendingSync → Synced
    /// * `Ok(false)` - already synced
    /// * `Err(InvalidState)` - the level is local-only
    /// * `Err(NotFound)` - no such level
    pub async fn mark_synced(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE price_levels SET sync_state = 'synced'
             WHERE id = ?1 AND sync_state = 'pending_sync'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            debug!(price_level_id = %id, "Price level synced");
            return Ok(true);
        }

        let level = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("PriceLevel", id))?;
        match level.sync_state {
            PriceLevelSyncState::Synced => Ok(false),
            other => Err(DbError::invalid_state(
                "PriceLevel",
                id,
                format!("cannot mark a {} level synced", other.as_str()),
            )),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, employee, tenant};

    #[tokio::test]
    async fn test_ensure_standard_is_idempotent() {
        let db = db().await;
        let t = tenant(&db, "acme", None).await;

        let first = db.price_levels().ensure_standard(&t.id).await.unwrap();
        let second = db.price_levels().ensure_standard(&t.id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.is_standard);
        assert_eq!(first.sync_state, PriceLevelSyncState::Local);
    }

    #[tokio::test]
    async fn test_create_sets_initial_state() {
        let db = db().await;
        let t = tenant(&db, "acme", None).await;

        let synced = db.price_levels().create(&t.id, "Wholesale", true).await.unwrap();
        let local = db.price_levels().create(&t.id, "Staff", false).await.unwrap();

        assert_eq!(synced.sync_state, PriceLevelSyncState::PendingSync);
        assert_eq!(local.sync_state, PriceLevelSyncState::Local);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_standard() {
        let db = db().await;
        let t = tenant(&db, "acme", None).await;
        db.price_levels().create(&t.id, "Retail", true).await.unwrap();

        assert!(matches!(
            db.price_levels().create(&t.id, "Retail", false).await,
            Err(DbError::UniqueViolation { .. })
        ));
        assert!(matches!(
            db.price_levels().create(&t.id, "standard", false).await,
            Err(DbError::Domain(CoreError::StandardPriceLevelImmutable))
        ));

        // Another tenant may reuse the name
        let other = tenant(&db, "other", None).await;
        db.price_levels().create(&other.id, "Retail", true).await.unwrap();
    }

    #[tokio::test]
    async fn test_standard_cannot_be_deleted() {
        let db = db().await;
        let t = tenant(&db, "acme", None).await;
        let standard = db.price_levels().ensure_standard(&t.id).await.unwrap();
        let retail = db.price_levels().create(&t.id, "Retail", false).await.unwrap();

        assert!(matches!(
            db.price_levels().delete(&standard.id).await,
            Err(DbError::InvalidState { .. })
        ));
        db.price_levels().delete(&retail.id).await.unwrap();

        let names: Vec<_> = db
            .price_levels()
            .list(&t.id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Standard".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_pending_requires_endpoint() {
        let db = db().await;
        let with = tenant(&db, "acme", Some(("erp.local", 9000))).await;
        let without = tenant(&db, "bare", None).await;

        let a = db.price_levels().create(&with.id, "Wholesale", true).await.unwrap();
        db.price_levels().create(&with.id, "Staff", false).await.unwrap();
        db.price_levels().create(&without.id, "Wholesale", true).await.unwrap();

        let pending = db.price_levels().fetch_pending(20).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.id);

        let scoped = db
            .price_levels()
            .fetch_pending_for_tenant(&without.id, 20)
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
    }

    #[tokio::test]
    async fn test_employee_inherits_endpoint_for_discovery() {
        let db = db().await;
        let t = tenant(&db, "acme", Some(("erp.local", 9000))).await;
        let clerk = employee(&db, &t, "clerk").await;
        db.price_levels().create(&clerk.id, "Counter", true).await.unwrap();

        assert_eq!(db.price_levels().fetch_pending(20).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_synced() {
        let db = db().await;
        let t = tenant(&db, "acme", None).await;
        let pending = db.price_levels().create(&t.id, "Wholesale", true).await.unwrap();
        let local = db.price_levels().create(&t.id, "Staff", false).await.unwrap();

        assert!(db.price_levels().mark_synced(&pending.id).await.unwrap());
        assert!(!db.price_levels().mark_synced(&pending.id).await.unwrap());
        assert!(matches!(
            db.price_levels().mark_synced(&local.id).await,
            Err(DbError::InvalidState { .. })
        ));
        assert!(matches!(
            db.price_levels().mark_synced("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
