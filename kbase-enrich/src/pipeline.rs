//! Enrichment pipeline
//!
//! One pass: classify unenriched items, query each source in turn, merge the
//! results into the catalog and recount. [`Enricher::run`] wraps the pass in a
//! store load/save cycle.
//!
//! Everything is sequential. Per-item and per-batch failures are logged and
//! the pass moves on; only an unreadable store aborts it.

use crate::classifier::{classify, Classification};
use crate::merge::{apply_to_handles, merge_arxiv_batch, EnrichmentPatch, MergeMode};
use crate::scheduler::BatchScheduler;
use crate::sources::anthology::{anthology_date, scrape_page};
use crate::sources::generic::url_date;
use crate::sources::{AnthologyClient, ArxivClient, ArxivFetcher, PageFetcher, SourceError};
use kbase_common::config::EnrichmentConfig;
use kbase_common::{Catalog, CatalogStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Counters reported after a pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    /// Distinct arXiv ids plus anthology and generic papers
    pub papers_processed: usize,
    /// Items written from a resolved arXiv entry
    pub arxiv_enriched: usize,
    /// Anthology items that got an abstract
    pub acl_enriched: usize,
    pub items_with_summary: usize,
    pub total_items: usize,
}

/// Runs enrichment passes against a pair of fetchers
pub struct Enricher {
    arxiv: Arc<dyn ArxivFetcher>,
    pages: Arc<dyn PageFetcher>,
    scheduler: BatchScheduler,
    anthology_host: String,
    item_delay: Duration,
}

impl Enricher {
    pub fn new(
        arxiv: Arc<dyn ArxivFetcher>,
        pages: Arc<dyn PageFetcher>,
        config: &EnrichmentConfig,
    ) -> Self {
        Self {
            arxiv,
            pages,
            scheduler: BatchScheduler::from_config(config),
            anthology_host: config.anthology_host.clone(),
            item_delay: config.item_delay(),
        }
    }

    /// Enricher backed by the real HTTP clients
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, SourceError> {
        Ok(Self::new(
            Arc::new(ArxivClient::new(config)?),
            Arc::new(AnthologyClient::new(config)?),
            config,
        ))
    }

    /// Load the store, enrich, write it back
    pub async fn run(&self, store: &CatalogStore) -> kbase_common::Result<EnrichmentSummary> {
        info!("Loading knowledge base from {}", store.path().display());
        let mut catalog = load_store(store).await?;

        let summary = self.enrich(&mut catalog).await;

        info!("Writing enriched catalog to {}", store.path().display());
        save_store(store, catalog).await?;
        Ok(summary)
    }

    /// One enrichment pass over an in-memory catalog
    pub async fn enrich(&self, catalog: &mut Catalog) -> EnrichmentSummary {
        let buckets = classify(catalog, &self.anthology_host);
        info!(
            arxiv = buckets.arxiv.len(),
            anthology = buckets.anthology.len(),
            generic = buckets.generic.len(),
            non_document = buckets.non_document.len(),
            already_enriched = buckets.already_enriched,
            "Classified catalog"
        );

        let arxiv_enriched = self.enrich_arxiv(catalog, &buckets).await;
        let acl_enriched = self.enrich_anthology(catalog, &buckets).await;
        self.enrich_generic(catalog, &buckets);

        if !buckets.non_document.is_empty() {
            info!(
                "{} non-paper items left with null enrichment fields",
                buckets.non_document.len()
            );
        }

        catalog.recount();
        let summary = EnrichmentSummary {
            papers_processed: buckets.papers_processed(),
            arxiv_enriched,
            acl_enriched,
            items_with_summary: catalog.items_with_summary(),
            total_items: catalog.metadata.total_items,
        };

        info!(
            papers_processed = summary.papers_processed,
            items_with_summary = summary.items_with_summary,
            total_items = summary.total_items,
            "Enrichment pass done"
        );
        summary
    }

    async fn enrich_arxiv(&self, catalog: &mut Catalog, buckets: &Classification) -> usize {
        if buckets.arxiv.is_empty() {
            info!("No new arxiv papers to enrich");
            return 0;
        }

        info!("Enriching {} arxiv papers", buckets.arxiv.len());
        let outcomes = self
            .scheduler
            .run(buckets.arxiv.ids(), self.arxiv.as_ref())
            .await;

        let enriched: usize = outcomes
            .iter()
            .map(|outcome| merge_arxiv_batch(catalog, &buckets.arxiv, &outcome.ids, &outcome.results))
            .sum();

        info!("Enriched {} arxiv papers", enriched);
        enriched
    }

    async fn enrich_anthology(&self, catalog: &mut Catalog, buckets: &Classification) -> usize {
        if buckets.anthology.is_empty() {
            info!("No new ACL Anthology papers to enrich");
            return 0;
        }

        info!("Enriching {} ACL Anthology papers", buckets.anthology.len());
        let mut enriched = 0;

        for handle in &buckets.anthology {
            let Some(url) = catalog.item(*handle).map(|item| item.url().to_string()) else {
                continue;
            };
            info!("Fetching ACL: {}", url);

            let mut patch = EnrichmentPatch {
                date: anthology_date(&url),
                ..Default::default()
            };

            match self.pages.fetch_page(&url).await {
                Ok(html) => {
                    let page = scrape_page(&html);
                    if page.summary.is_some() {
                        enriched += 1;
                    }
                    patch.summary = page.summary;
                    patch.authors = page.authors;
                }
                Err(e) => warn!("Failed to fetch {}: {}", url, e),
            }

            apply_to_handles(catalog, &[*handle], &patch, MergeMode::PreferNew);

            if !self.item_delay.is_zero() {
                tokio::time::sleep(self.item_delay).await;
            }
        }

        info!("Enriched {} ACL papers with abstracts", enriched);
        enriched
    }

    fn enrich_generic(&self, catalog: &mut Catalog, buckets: &Classification) {
        if buckets.generic.is_empty() {
            return;
        }

        info!(
            "Processing {} other papers (URL heuristics)",
            buckets.generic.len()
        );
        for handle in &buckets.generic {
            let Some(date) = catalog.item(*handle).and_then(|item| url_date(item.url())) else {
                continue;
            };
            let patch = EnrichmentPatch {
                date: Some(date),
                ..Default::default()
            };
            apply_to_handles(catalog, &[*handle], &patch, MergeMode::PreferNew);
        }
    }
}

/// [`CatalogStore::load`] on the blocking pool
pub async fn load_store(store: &CatalogStore) -> kbase_common::Result<Catalog> {
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|e| kbase_common::Error::Internal(format!("Task join error: {}", e)))?
}

/// [`CatalogStore::save`] on the blocking pool; returns the saved document
/// with its counters recomputed
pub async fn save_store(store: &CatalogStore, catalog: Catalog) -> kbase_common::Result<Catalog> {
    let store = store.clone();
    tokio::task::spawn_blocking(move || {
        let mut catalog = catalog;
        store.save(&mut catalog).map(|()| catalog)
    })
    .await
    .map_err(|e| kbase_common::Error::Internal(format!("Task join error: {}", e)))?
}
