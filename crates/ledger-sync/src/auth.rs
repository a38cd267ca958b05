//! # Bridge Authentication
//!
//! Holds the bridge agent's bearer token for the central service.
//!
//! ## Authentication Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bridge Authentication Flow                         │
//! │                                                                         │
//! │  ┌────────────────┐                    ┌─────────────────┐             │
//! │  │  bridge-agent  │                    │  central-api    │             │
//! │  └───────┬────────┘                    └────────┬────────┘             │
//! │          │  1. POST /auth/login                  │                      │
//! │          │     {username, password}              │                      │
//! │          │──────────────────────────────────────►│                      │
//! │          │  2. {access_token, expires_in}        │                      │
//! │          │◄──────────────────────────────────────│                      │
//! │          │                                       │                      │
//! │          │  [startup login fails → process exits]                       │
//! │          │                                       │                      │
//! │          │  3. Authorization: Bearer ...         │                      │
//! │          │──────────────────────────────────────►│                      │
//! │          │                                       │                      │
//! │          │  [token near expiry or answered 401]  │                      │
//! │          │  → log in again on the next request   │                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::protocol::{routes, LoginRequest, TokenResponse};

/// Margin before token expiration to log in again (1 minute)
const REFRESH_MARGIN_SECS: u64 = 60;

/// Token obtained from a login exchange.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub access_token: String,
    /// When the access token expires (local time)
    pub expires_at: Instant,
}

impl SessionToken {
    fn from_response(response: TokenResponse) -> Self {
        SessionToken {
            access_token: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        }
    }

    /// Check if the token is expired or about to expire
    pub fn needs_refresh(&self) -> bool {
        Instant::now() + Duration::from_secs(REFRESH_MARGIN_SECS) >= self.expires_at
    }
}

/// Operator identity the bridge logs in with.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bearer-token session against the central service.
#[derive(Debug)]
pub struct AuthSession {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token: RwLock<Option<SessionToken>>,
}

impl AuthSession {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, credentials: Credentials) -> Self {
        AuthSession {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchanges the credentials for a fresh token.
    ///
    /// ## Errors
    /// * `AuthenticationFailed` - the central service refused the login
    /// * `TransportFailure` - the central service could not be reached
    pub async fn login(&self) -> SyncResult<()> {
        let url = format!("{}{}", self.base_url, routes::LOGIN);
        debug!(url = %url, username = %self.credentials.username, "Logging in");

        let response = self
            .http
            .post(&url)
            .json(&LoginRequest {
                username: self.credentials.username.clone(),
                password: self.credentials.password.clone(),
            })
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SyncError::AuthenticationFailed(format!(
                "login refused for {} ({status})",
                self.credentials.username
            )));
        }
        if !status.is_success() {
            return Err(SyncError::CentralRejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: TokenResponse = response.json().await?;
        let token = SessionToken::from_response(body);
        info!(
            username = %self.credentials.username,
            expires_in_secs = token.expires_at.saturating_duration_since(Instant::now()).as_secs(),
            "Authenticated with central service"
        );
        *self.token.write().await = Some(token);
        Ok(())
    }

    /// Current access token, logging in again first if it is missing or
    /// about to expire.
    pub async fn bearer(&self) -> SyncResult<String> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref().filter(|t| !t.needs_refresh()) {
                return Ok(token.access_token.clone());
            }
        }

        self.login().await?;
        self.token
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or_else(|| SyncError::AuthenticationFailed("no token after login".into()))
    }

    /// Drops the current token after the central service rejected it.
    pub async fn invalidate(&self) {
        warn!("Bearer token rejected, will log in again");
        *self.token.write().await = None;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session(url: &str) -> AuthSession {
        AuthSession::new(
            reqwest::Client::new(),
            url,
            Credentials {
                username: "operator".into(),
                password: "secret".into(),
            },
        )
    }

    #[test]
    fn test_token_refresh_margin() {
        let fresh = SessionToken {
            access_token: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        assert!(!fresh.needs_refresh());

        let stale = SessionToken {
            access_token: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(stale.needs_refresh());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "op".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn test_login_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(serde_json::json!({"username": "operator", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server.uri());
        session.login().await.unwrap();
        assert_eq!(session.bearer().await.unwrap(), "abc");
        assert_eq!(session.bearer().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_login_refused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = session(&server.uri()).login().await.unwrap_err();
        assert!(matches!(err, SyncError::AuthenticationFailed(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_unreachable_central_is_transport_failure() {
        let err = session("http://127.0.0.1:9").login().await.unwrap_err();
        assert!(matches!(err, SyncError::TransportFailure(_)));
    }
}
