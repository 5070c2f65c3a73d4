//! Overlay reconciliation
//!
//! Wraps a cached [`Overlay`] and commits its commit view through a
//! [`CommitTransport`]:
//!
//! - [`LocalExport`] writes the merged document to a file of the caller's
//!   choosing.
//! - [`ServerPush`] posts it to `/api/save` on a running service, then asks
//!   that service for an enrichment pass via `/api/enrich`.
//!
//! Pending lists are cleared only after the transport reports success. A
//! failed commit leaves the overlay exactly as it was.

use crate::api::catalog::{EnrichResponse, SaveResponse};
use crate::pipeline::{save_store, EnrichmentSummary};
use async_trait::async_trait;
use kbase_common::overlay::DEFAULT_OVERLAY_KEY;
use kbase_common::{Catalog, CatalogStore, DisplayView, ItemDraft, Overlay, OverlayCache, OverlayError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Reconciliation errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Store(#[from] kbase_common::Error),

    #[error("Network error: {0}")]
    Network(String),

    /// The server answered but refused the request
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ReconcileError {
    fn from(e: reqwest::Error) -> Self {
        ReconcileError::Network(e.to_string())
    }
}

/// Where a committed document ended up
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Exported { path: PathBuf },
    Saved { summary: EnrichmentSummary },
}

/// Outcome of a successful commit
///
/// Counts reflect the delivered document: skipped additions and removals of
/// urls not in the store are not counted.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub additions: usize,
    pub removals: usize,
    pub delivery: Delivery,
}

/// Destination for a committed document
#[async_trait]
pub trait CommitTransport: Send + Sync {
    async fn deliver(&self, document: &mut Catalog) -> Result<Delivery, ReconcileError>;
}

/// Write the document to a local file
pub struct LocalExport {
    path: PathBuf,
}

impl LocalExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CommitTransport for LocalExport {
    async fn deliver(&self, document: &mut Catalog) -> Result<Delivery, ReconcileError> {
        let store = CatalogStore::new(&self.path);
        *document = save_store(&store, std::mem::take(document)).await?;
        Ok(Delivery::Exported {
            path: self.path.clone(),
        })
    }
}

/// Save to a running service and trigger enrichment there
pub struct ServerPush {
    http_client: reqwest::Client,
    base_url: String,
}

impl ServerPush {
    /// `timeout` must cover a whole enrichment pass on the server
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ReconcileError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CommitTransport for ServerPush {
    async fn deliver(&self, document: &mut Catalog) -> Result<Delivery, ReconcileError> {
        let save: SaveResponse = self
            .http_client
            .post(format!("{}/api/save", self.base_url))
            .json(document)
            .send()
            .await?
            .json()
            .await?;
        if !save.success {
            return Err(ReconcileError::Rejected(
                save.error.unwrap_or_else(|| "Save failed".to_string()),
            ));
        }

        let enrich: EnrichResponse = self
            .http_client
            .post(format!("{}/api/enrich", self.base_url))
            .send()
            .await?
            .json()
            .await?;
        match (enrich.success, enrich.summary) {
            (true, Some(summary)) => Ok(Delivery::Saved { summary }),
            (_, _) => Err(ReconcileError::Rejected(
                enrich.error.unwrap_or_else(|| "Enrich failed".to_string()),
            )),
        }
    }
}

/// Cached overlay plus commit
pub struct ReconciliationService {
    cache: OverlayCache,
    key: String,
    overlay: Overlay,
}

impl ReconciliationService {
    /// Open the overlay stored under `key`
    pub fn open(cache: OverlayCache, key: impl Into<String>) -> Self {
        let key = key.into();
        let overlay = cache.load(&key);
        Self {
            cache,
            key,
            overlay,
        }
    }

    pub fn open_default(cache: OverlayCache) -> Self {
        Self::open(cache, DEFAULT_OVERLAY_KEY)
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    fn persist(&self) -> Result<(), ReconcileError> {
        self.cache.save(&self.key, &self.overlay)?;
        Ok(())
    }

    pub fn add_pending(&mut self, draft: ItemDraft) -> Result<(), ReconcileError> {
        self.overlay.add_pending(draft)?;
        self.persist()
    }

    /// Returns whether the url is now marked for removal
    pub fn toggle_removal(&mut self, url: &str) -> Result<bool, ReconcileError> {
        let marked = self.overlay.toggle_removal(url);
        self.persist()?;
        Ok(marked)
    }

    /// Returns how many removals were dropped
    pub fn clear_removals(&mut self) -> Result<usize, ReconcileError> {
        let count = self.overlay.pending_removals.len();
        self.overlay.clear_removals();
        self.persist()?;
        Ok(count)
    }

    pub fn display_view(&self, store: &Catalog) -> DisplayView {
        self.overlay.display_view(store)
    }

    pub fn commit_view(&self, store: &Catalog) -> Catalog {
        self.overlay.commit_view(store)
    }

    /// Deliver the commit view; on success the overlay is emptied
    pub async fn commit(
        &mut self,
        store: &Catalog,
        transport: &dyn CommitTransport,
    ) -> Result<CommitReport, ReconcileError> {
        let commit = self.overlay.prepare_commit(store);
        let (additions, removals) = (commit.added, commit.removed);
        let mut document = commit.catalog;

        let delivery = transport.deliver(&mut document).await?;

        self.overlay.clear();
        if let Err(e) = self.persist() {
            // already applied upstream; a stale cache only re-queues no-ops
            warn!("Commit delivered but overlay cache not cleared: {}", e);
        }

        info!(additions, removals, "Overlay committed");
        Ok(CommitReport {
            additions,
            removals,
            delivery,
        })
    }
}
