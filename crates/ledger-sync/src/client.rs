//! # Sync Client
//!
//! One XML POST to one ERP terminal. No retries here: a failed call is
//! simply attempted again on the next cycle.
//!
//! ```text
//! SyncEngine ──send(envelope, endpoint)──► POST http://host:port
//!                                          Content-Type: application/xml
//!                                          timeout: 10s
//!       ◄── Ok(body)            any 2xx response
//!       ◄── Err(TransportFailure) refused / timed out / non-2xx
//! ```

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use ledger_core::codec::build_connection_test;
use ledger_core::TenantEndpoint;

/// Default per-request timeout for ERP terminals.
pub const DEFAULT_TERMINAL_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for ERP terminals. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SyncClient {
    http: reqwest::Client,
}

impl SyncClient {
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(SyncClient { http })
    }

    /// POSTs `envelope` to the terminal and returns the raw response body.
    pub async fn send(&self, envelope: &str, endpoint: &TenantEndpoint) -> SyncResult<String> {
        let url = endpoint.url();
        debug!(endpoint = %url, bytes = envelope.len(), "Sending envelope");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/xml")
            .body(envelope.to_string())
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %url, error = %e, "ERP terminal unreachable");
                SyncError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %url, %status, "ERP terminal returned an error status");
            return Err(SyncError::TransportFailure(format!(
                "{url} responded with {status}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            SyncError::TransportFailure(format!("failed to read response from {url}: {e}"))
        })?;
        debug!(endpoint = %url, bytes = body.len(), "Envelope answered");
        Ok(body)
    }

    /// Sends the company-list request. Any answer counts as reachable.
    pub async fn test_connection(&self, endpoint: &TenantEndpoint) -> SyncResult<()> {
        self.send(&build_connection_test(), endpoint).await.map(|_| ())
    }
}
