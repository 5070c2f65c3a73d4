//! Catalog save and enrich endpoints
//!
//! Both handlers run a full load/modify/store cycle against the configured
//! [`CatalogStore`](kbase_common::CatalogStore), with file I/O on the blocking
//! pool. Requests are not serialized
//! against each other; overlapping cycles race and the last write wins.

use crate::pipeline::{save_store, EnrichmentSummary};
use crate::{ApiError, ApiResult, AppState};
use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use kbase_common::Catalog;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Response payload for POST /api/save
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response payload for POST /api/enrich
///
/// Summary counters sit at the top level next to `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub summary: Option<EnrichmentSummary>,
}

/// POST /api/save
///
/// **Request:** a full catalog document
/// **Response:** `{"success": true, "message": "..."}`
///
/// A body that is not a catalog is a 500 with the usual JSON error shape.
pub async fn save_catalog(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<SaveResponse>> {
    let result = async {
        let catalog: Catalog = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Malformed catalog: {}", e)))?;
        let saved = save_store(&state.store, catalog).await?;
        Ok::<_, ApiError>(saved.metadata.total_items)
    }
    .await;

    match result {
        Ok(total_items) => {
            info!(total_items, "Catalog saved via API");
            Ok(Json(SaveResponse {
                success: true,
                message: Some(format!(
                    "Saved {} items to {}",
                    total_items,
                    state.store.path().display()
                )),
                error: None,
            }))
        }
        Err(e) => Err(state.record_error(e).await),
    }
}

/// POST /api/enrich
///
/// **Response:** `{"success": true, "papers_processed": N, ...}`
pub async fn enrich_catalog(State(state): State<AppState>) -> ApiResult<Json<EnrichResponse>> {
    info!("Enrichment requested via API");
    match state.enricher.run(&state.store).await {
        Ok(summary) => Ok(Json(EnrichResponse {
            success: true,
            error: None,
            summary: Some(summary),
        })),
        Err(e) => Err(state.record_error(e.into()).await),
    }
}

impl AppState {
    async fn record_error(&self, e: ApiError) -> ApiError {
        error!("API request failed: {}", e);
        *self.last_error.write().await = Some(e.to_string());
        e
    }
}

/// Build catalog routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/save", post(save_catalog))
        .route("/api/enrich", post(enrich_catalog))
}
