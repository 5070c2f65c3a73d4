//! Upstream metadata sources
//!
//! - [`arxiv`]: bulk Atom feed queries, up to one batch of ids per request
//! - [`anthology`]: one HTML page per paper, scraped for abstract and authors
//! - [`generic`]: no network, year recovered from the url
//!
//! Non-document items have no source at all; their enrichment fields stay
//! null and are still written out as explicit `null`s.
//!
//! Network access goes through the [`ArxivFetcher`] and [`PageFetcher`]
//! traits so the pipeline can run against in-memory fakes.

pub mod anthology;
pub mod arxiv;
pub mod generic;

pub use anthology::{AnthologyClient, PageMetadata};
pub use arxiv::ArxivClient;

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Source errors
///
/// Every variant means "no data" for the unit of work that hit it. Nothing
/// is retried.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Network(e.to_string())
    }
}

/// Metadata recovered for one paper
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperMetadata {
    /// Only used for title lookup; never merged into items
    pub title: Option<String>,
    pub summary: Option<String>,
    pub date: Option<String>,
    pub authors: Option<Vec<String>>,
}

/// Results of one bulk query, keyed by arXiv id
pub type ArxivResults = HashMap<String, PaperMetadata>;

/// Bulk arXiv lookup
#[async_trait]
pub trait ArxivFetcher: Send + Sync {
    /// One request for the whole batch. Ids missing from the response are
    /// simply absent from the map.
    async fn fetch_batch(&self, ids: &[String]) -> Result<ArxivResults, SourceError>;
}

/// Single page download
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, SourceError>;
}
