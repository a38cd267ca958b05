//! Connection test for the ERP settings screen.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use ledger_core::{TenantEndpoint, DEFAULT_SALES_LEDGER};
use ledger_sync::protocol::{ConnectionTestRequest, ConnectionTestResponse};

/// `POST /erp/test`
///
/// Sends the company-list request to `host:port`. An unreachable terminal
/// is a normal answer (`reachable: false`), not an error.
pub async fn test_connection(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConnectionTestRequest>,
) -> ApiResult<Json<ConnectionTestResponse>> {
    let host = request.host.trim();
    if host.is_empty() || request.port == 0 {
        return Err(ApiError::InvalidRequest(
            "host and port are required".to_string(),
        ));
    }

    let endpoint = TenantEndpoint {
        host: host.to_string(),
        port: request.port,
        sales_ledger: DEFAULT_SALES_LEDGER.to_string(),
    };

    let response = match state.terminal.test_connection(&endpoint).await {
        Ok(()) => ConnectionTestResponse {
            reachable: true,
            message: format!("Connected to {}", endpoint.url()),
        },
        Err(e) => ConnectionTestResponse {
            reachable: false,
            message: e.to_string(),
        },
    };

    info!(
        account_id = %caller.account_id,
        endpoint = %endpoint.url(),
        reachable = response.reachable,
        "ERP connection test"
    );
    Ok(Json(response))
}
