//! kbase-enrich library interface
//!
//! Enrichment pipeline, source adapters, overlay reconciliation and the
//! local HTTP service. Exposed as a library for integration testing.

pub mod api;
pub mod classifier;
pub mod error;
pub mod extract;
pub mod merge;
pub mod pipeline;
pub mod reconcile;
pub mod scheduler;
pub mod sources;

pub use crate::error::{ApiError, ApiResult};
pub use crate::pipeline::{Enricher, EnrichmentSummary};

use axum::http::{header, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use kbase_common::CatalogStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Authoritative catalog file
    pub store: CatalogStore,
    pub enricher: Arc<Enricher>,
    /// Rendered page served at `GET /`
    pub page_path: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(store: CatalogStore, enricher: Enricher, page_path: Option<PathBuf>) -> Self {
        Self {
            store,
            enricher: Arc::new(enricher),
            page_path,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
///
/// Without a configured page, `GET /` falls through to 404.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let mut router = Router::new()
        .merge(api::catalog_routes())
        .merge(api::health_routes());

    if let Some(page) = &state.page_path {
        router = router.route_service("/", ServeFile::new(page));
    }

    router
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
