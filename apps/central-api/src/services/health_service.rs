//! Health check for monitoring.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: &'static str,
    pub database: bool,
    pub scheduler_running: bool,
    pub last_cycle_finished_at: Option<DateTime<Utc>>,
    pub last_cycle_clean: Option<bool>,
}

/// `GET /health`. 503 when the database does not answer.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let last = state.scheduler.as_ref().and_then(|h| h.last_report());

    let response = HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        scheduler_running: state.scheduler.as_ref().is_some_and(|h| h.is_running()),
        last_cycle_finished_at: last.as_ref().map(|r| r.finished_at),
        last_cycle_clean: last.as_ref().map(|r| r.is_clean()),
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
