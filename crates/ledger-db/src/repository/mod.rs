//! # Repository Module
//!
//! Repository implementations for the reconciliation store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SyncEngine / REST handler                                              │
//! │       │                                                                 │
//! │       │  db.orders().fetch_pending(50)                                 │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── fetch_pending(limit)           discovery across all tenants       │
//! │  ├── fetch_pending_for_tenant(..)   one tenant, for bridge agents      │
//! │  ├── mark_posted(id, voucher)       targeted, idempotent               │
//! │  └── create(new_order)              snapshot pricing at checkout       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries use runtime `sqlx::query_as` with private `FromRow` row structs,
//! converted into `ledger_core` types at the boundary.
//!
//! ## Available Repositories
//!
//! - [`account::AccountRepository`] - Accounts, logins, endpoint resolution
//! - [`order::OrderRepository`] - Orders and lines
//! - [`price_level::PriceLevelRepository`] - Price tiers
//! - [`product::ProductRepository`] - Catalog and tier prices

pub mod account;
pub mod order;
pub mod price_level;
pub mod product;

/// SQL fragment: true when account `a` (with parent join `p`) has an
/// endpoint declared on itself or on its parent.
pub(crate) const HAS_ENDPOINT: &str = "(
        (a.erp_host IS NOT NULL AND TRIM(a.erp_host) <> '' AND a.erp_port IS NOT NULL)
     OR (p.erp_host IS NOT NULL AND TRIM(p.erp_host) <> '' AND p.erp_port IS NOT NULL)
    )";

/// SQL fragment: account `a` is the tenant `?` or one of its employees.
pub(crate) const IN_TENANT: &str = "(a.id = ? OR a.parent_id = ?)";

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{Database, DbConfig, NewAccount, NewProduct};
    use ledger_core::{Account, Money, Product};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn tenant(db: &Database, name: &str, endpoint: Option<(&str, u16)>) -> Account {
        db.accounts()
            .create(&NewAccount {
                parent_id: None,
                username: name.to_string(),
                password_hash: "x".to_string(),
                erp_host: endpoint.map(|(h, _)| h.to_string()),
                erp_port: endpoint.map(|(_, p)| p),
                sales_ledger: None,
            })
            .await
            .unwrap()
    }

    pub async fn employee(db: &Database, parent: &Account, name: &str) -> Account {
        db.accounts()
            .create(&NewAccount {
                parent_id: Some(parent.id.clone()),
                username: name.to_string(),
                password_hash: "x".to_string(),
                erp_host: None,
                erp_port: None,
                sales_ledger: None,
            })
            .await
            .unwrap()
    }

    pub async fn product(db: &Database, owner: &Account, name: &str, cents: i64) -> Product {
        db.products()
            .insert(&NewProduct {
                account_id: owner.id.clone(),
                name: name.to_string(),
                base_price: Money::from_cents(cents),
                stock: 10.0,
            })
            .await
            .unwrap()
    }
}
