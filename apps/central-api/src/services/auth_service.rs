//! Login exchange: username and password for a bearer token.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::{info, warn};

use crate::auth::verify_password;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use ledger_sync::protocol::{LoginRequest, TokenResponse};

/// `POST /auth/login`
///
/// ## Errors
/// * `AuthFailed` (401) - unknown username or wrong password
/// * `Unauthorized` (403) - the account or its tenant is inactive
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let username = request.username.trim();
    let record = state.db.accounts().find_login(username).await?;

    let Some(record) = record.filter(|r| verify_password(&request.password, &r.password_hash))
    else {
        warn!(username, "Login refused: invalid credentials");
        return Err(ApiError::AuthFailed("Invalid username or password".to_string()));
    };

    if !record.may_login() {
        warn!(username, "Login refused: account inactive");
        return Err(ApiError::Unauthorized("Account is inactive".to_string()));
    }

    let account = record.account;
    let tenant_id = account.parent_id.clone().unwrap_or_else(|| account.id.clone());
    let access_token = state
        .jwt
        .generate_access_token(&account.id, &tenant_id, &account.username)?;

    info!(account_id = %account.id, tenant_id = %tenant_id, "Login succeeded");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: u64::try_from(state.jwt.access_lifetime_secs()).unwrap_or(0),
    }))
}
