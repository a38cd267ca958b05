//! # Endpoint Resolver
//!
//! Where does an account's ERP terminal live?
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Endpoint Resolution                                │
//! │                                                                         │
//! │  CENTRAL (StoreLocator)                                                │
//! │    account's own host+port ──► else its tenant's ──► else None (skip) │
//! │    one hop only, so resolution always terminates                       │
//! │                                                                         │
//! │  BRIDGE (FixedLocator)                                                 │
//! │    every account ──► the terminal on this LAN (from config)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;

use crate::error::SyncResult;
use ledger_core::TenantEndpoint;
use ledger_db::Database;

/// Finds the terminal for an account. `Ok(None)` means "unconfigured",
/// which callers treat as skip-this-tenant rather than an error.
#[async_trait]
pub trait TerminalLocator: Send + Sync {
    async fn locate(&self, account_id: &str) -> SyncResult<Option<TenantEndpoint>>;
}

/// Resolves endpoints from account declarations in the store.
#[derive(Debug, Clone)]
pub struct StoreLocator {
    db: Database,
}

impl StoreLocator {
    pub fn new(db: Database) -> Self {
        StoreLocator { db }
    }
}

#[async_trait]
impl TerminalLocator for StoreLocator {
    async fn locate(&self, account_id: &str) -> SyncResult<Option<TenantEndpoint>> {
        Ok(self.db.accounts().resolve_endpoint(account_id).await?)
    }
}

/// Always answers with the same terminal.
#[derive(Debug, Clone)]
pub struct FixedLocator {
    endpoint: TenantEndpoint,
}

impl FixedLocator {
    pub fn new(endpoint: TenantEndpoint) -> Self {
        FixedLocator { endpoint }
    }

    pub fn endpoint(&self) -> &TenantEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl TerminalLocator for FixedLocator {
    async fn locate(&self, _account_id: &str) -> SyncResult<Option<TenantEndpoint>> {
        Ok(Some(self.endpoint.clone()))
    }
}
