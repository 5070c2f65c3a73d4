//! Liveness and last-failure report
//!
//! `kbase overlay push` and the rendered page only need to know the service is
//! up before posting a catalog. After a push fails, `last_error` tells the user
//! why without digging through the service log.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Body of GET /health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process answers
    pub status: String,
    pub module: String,
    pub version: String,
    /// Seconds since [`AppState::new`]
    pub uptime_seconds: u64,
    /// Message of the most recent failed `/api/save` or `/api/enrich`
    ///
    /// Sticky: a later success does not clear it. Omitted until a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
///
/// Never touches the catalog file, so it stays cheap while an enrichment pass
/// is running.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "kbase".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        last_error,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
