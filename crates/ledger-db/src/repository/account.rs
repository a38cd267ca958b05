//! # Account Repository
//!
//! Accounts, login lookups, and endpoint resolution.
//!
//! ## Account Hierarchy
//! ```text
//! ┌──────────────────────────┐
//! │ tenant (parent_id NULL)  │  erp_host/erp_port declared here
//! └────────────┬─────────────┘
//!              │ parent_id
//!   ┌──────────┴──────────┐
//!   ▼                     ▼
//! employee A           employee B     inherit the tenant's endpoint
//!                                     unless they declare their own
//! ```
//!
//! Only one level is followed. An employee's parent is a tenant, and a
//! tenant's own parent (if any) is never consulted.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use ledger_core::{Account, AccountStatus, EndpointDeclaration, TenantEndpoint};

/// Input for [`AccountRepository::create`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub parent_id: Option<String>,
    pub username: String,
    /// Already hashed (argon2 PHC string).
    pub password_hash: String,
    pub erp_host: Option<String>,
    pub erp_port: Option<u16>,
    pub sales_ledger: Option<String>,
}

/// What the login handler needs to decide whether to issue a token.
#[derive(Debug, Clone)]
pub struct LoginRecord {
    pub account: Account,
    pub password_hash: String,
    /// Status of the parent tenant, for employee accounts.
    pub parent_status: Option<AccountStatus>,
}

impl LoginRecord {
    /// Active itself, and not an employee of an inactive tenant.
    pub fn may_login(&self) -> bool {
        self.account.status == AccountStatus::Active
            && self.parent_status != Some(AccountStatus::Inactive)
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: String,
    parent_id: Option<String>,
    username: String,
    status: AccountStatus,
    erp_host: Option<String>,
    erp_port: Option<i64>,
    sales_ledger: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            parent_id: row.parent_id,
            username: row.username,
            status: row.status,
            erp_host: row.erp_host,
            erp_port: row.erp_port.and_then(|p| u16::try_from(p).ok()),
            sales_ledger: row.sales_ledger,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EndpointRow {
    own_host: Option<String>,
    own_port: Option<i64>,
    own_ledger: Option<String>,
    parent_id: Option<String>,
    parent_host: Option<String>,
    parent_port: Option<i64>,
    parent_ledger: Option<String>,
}

const ACCOUNT_COLUMNS: &str =
    "id, parent_id, username, status, erp_host, erp_port, sales_ledger, created_at";

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Creates an account. Employees must point at an existing tenant.
    pub async fn create(&self, new: &NewAccount) -> DbResult<Account> {
        if let Some(parent_id) = &new.parent_id {
            let parent = self
                .get(parent_id)
                .await?
                .ok_or_else(|| DbError::not_found("Account", parent_id))?;
            if parent.parent_id.is_some() {
                return Err(DbError::invalid_state(
                    "Account",
                    parent_id,
                    "employees cannot have employees",
                ));
            }
        }

        let account = Account {
            id: Uuid::new_v4().to_string(),
            parent_id: new.parent_id.clone(),
            username: new.username.trim().to_string(),
            status: AccountStatus::Active,
            erp_host: new.erp_host.clone(),
            erp_port: new.erp_port,
            sales_ledger: new.sales_ledger.clone(),
            created_at: Utc::now(),
        };

        debug!(account_id = %account.id, username = %account.username, "Creating account");

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, parent_id, username, password_hash, status,
                erp_host, erp_port, sales_ledger, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&account.id)
        .bind(&account.parent_id)
        .bind(&account.username)
        .bind(&new.password_hash)
        .bind(account.status)
        .bind(&account.erp_host)
        .bind(account.erp_port.map(i64::from))
        .bind(&account.sales_ledger)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", &account.username),
            other => other,
        })?;

        Ok(account)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    /// Looks up an account by username for the login exchange.
    pub async fn find_login(&self, username: &str) -> DbResult<Option<LoginRecord>> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            account: AccountRow,
            password_hash: String,
            parent_status: Option<AccountStatus>,
        }

        let row = sqlx::query_as::<_, Row>(
            r#"
            SELECT
                a.id, a.parent_id, a.username, a.status, a.erp_host, a.erp_port,
                a.sales_ledger, a.created_at, a.password_hash,
                p.status AS parent_status
            FROM accounts a
            LEFT JOIN accounts p ON p.id = a.parent_id
            WHERE a.username = ?1
            "#,
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| LoginRecord {
            account: r.account.into(),
            password_hash: r.password_hash,
            parent_status: r.parent_status,
        }))
    }

    /// Updates the endpoint declared on an account. `None` clears a field.
    pub async fn update_endpoint(
        &self,
        id: &str,
        host: Option<&str>,
        port: Option<u16>,
        sales_ledger: Option<&str>,
    ) -> DbResult<()> {
        debug!(account_id = %id, host = ?host, port = ?port, "Updating ERP endpoint");

        let result = sqlx::query(
            "UPDATE accounts SET erp_host = ?2, erp_port = ?3, sales_ledger = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(host)
        .bind(port.map(i64::from))
        .bind(sales_ledger)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }
        Ok(())
    }

    pub async fn set_status(&self, id: &str, status: AccountStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE accounts SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }
        Ok(())
    }

    /// Resolves the ERP terminal endpoint for an account.
    ///
    /// Returns `Ok(None)` when neither the account nor its parent declares
    /// one, or when the account does not exist. Callers skip such tenants.
    pub async fn resolve_endpoint(&self, account_id: &str) -> DbResult<Option<TenantEndpoint>> {
        let row = sqlx::query_as::<_, EndpointRow>(
            r#"
            SELECT
                a.erp_host AS own_host,
                a.erp_port AS own_port,
                a.sales_ledger AS own_ledger,
                p.id AS parent_id,
                p.erp_host AS parent_host,
                p.erp_port AS parent_port,
                p.sales_ledger AS parent_ledger
            FROM accounts a
            LEFT JOIN accounts p ON p.id = a.parent_id
            WHERE a.id = ?1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let own = EndpointDeclaration {
            host: row.own_host,
            port: row.own_port.and_then(|p| u16::try_from(p).ok()),
            sales_ledger: row.own_ledger,
        };
        let parent = row.parent_id.map(|_| EndpointDeclaration {
            host: row.parent_host,
            port: row.parent_port.and_then(|p| u16::try_from(p).ok()),
            sales_ledger: row.parent_ledger,
        });

        let endpoint = EndpointDeclaration::resolve(&own, parent.as_ref());
        debug!(account_id = %account_id, resolved = endpoint.is_some(), "Resolved endpoint");
        Ok(endpoint)
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
    async fn test_employee_inherits_parent_endpoint() {
        let db = db().await;
        let t = tenant(&db, "acme", Some(("10.0.0.5", 9000))).await;
        let e = employee(&db, &t, "clerk").await;

        let ep = db.accounts().resolve_endpoint(&e.id).await.unwrap().unwrap();
        assert_eq!(ep.host, "10.0.0.5");
        assert_eq!(ep.port, 9000);
        assert_eq!(ep.sales_ledger, "Sales");
    }

    #[tokio::test]
    async fn test_own_endpoint_wins_over_parent() {
        let db = db().await;
        let t = tenant(&db, "acme", Some(("parent.local", 9000))).await;
        let e = employee(&db, &t, "branch").await;
        db.accounts()
            .update_endpoint(&e.id, Some("branch.local"), Some(9100), Some("Branch Sales"))
            .await
            .unwrap();

        let ep = db.accounts().resolve_endpoint(&e.id).await.unwrap().unwrap();
        assert_eq!(ep.host, "branch.local");
        assert_eq!(ep.port, 9100);
        assert_eq!(ep.sales_ledger, "Branch Sales");
    }

    #[tokio::test]
    async fn test_no_endpoint_anywhere_resolves_to_none() {
        let db = db().await;
        let t = tenant(&db, "acme", None).await;
        let e = employee(&db, &t, "clerk").await;

        assert!(db.accounts().resolve_endpoint(&e.id).await.unwrap().is_none());
        assert!(db.accounts().resolve_endpoint(&t.id).await.unwrap().is_none());
        assert!(db.accounts().resolve_endpoint("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_employee_cannot_parent_an_account() {
        let db = db().await;
        let t = tenant(&db, "acme", None).await;
        let e = employee(&db, &t, "clerk").await;

        let err = db
            .accounts()
            .create(&NewAccount {
                parent_id: Some(e.id.clone()),
                username: "nested".into(),
                password_hash: "x".into(),
                erp_host: None,
                erp_port: None,
                sales_ledger: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = db().await;
        tenant(&db, "acme", None).await;
        let err = db
            .accounts()
            .create(&NewAccount {
                parent_id: None,
                username: "acme".into(),
                password_hash: "x".into(),
                erp_host: None,
                erp_port: None,
                sales_ledger: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_login_refused_when_parent_inactive() {
        let db = db().await;
        let t = tenant(&db, "acme", None).await;
        employee(&db, &t, "clerk").await;

        let login = db.accounts().find_login("clerk").await.unwrap().unwrap();
        assert!(login.may_login());

        db.accounts().set_status(&t.id, AccountStatus::Inactive).await.unwrap();
        let login = db.accounts().find_login("clerk").await.unwrap().unwrap();
        assert!(!login.may_login());

        assert!(db.accounts().find_login("nobody").await.unwrap().is_none());
    }
}
