//! Shared fixtures: in-memory sources and a small catalog
#![allow(dead_code)]

use async_trait::async_trait;
use kbase_common::config::EnrichmentConfig;
use kbase_common::Catalog;
use kbase_enrich::sources::{ArxivFetcher, ArxivResults, PageFetcher, PaperMetadata, SourceError};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::Instant;

/// Canned arXiv answers; records every batch it is asked for
#[derive(Default)]
pub struct MockArxiv {
    entries: HashMap<String, PaperMetadata>,
    calls: Mutex<Vec<Vec<String>>>,
    fail: bool,
}

impl MockArxiv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, id: &str, meta: PaperMetadata) -> Self {
        self.entries.insert(id.to_string(), meta);
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArxivFetcher for MockArxiv {
    async fn fetch_batch(&self, ids: &[String]) -> Result<ArxivResults, SourceError> {
        self.calls.lock().unwrap().push(ids.to_vec());
        if self.fail {
            return Err(SourceError::Network("connection refused".to_string()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.entries.get(id).map(|meta| (id.clone(), meta.clone())))
            .collect())
    }
}

/// Canned pages by url; unknown urls answer 404
#[derive(Default)]
pub struct MockPages {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl MockPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    /// When each fetch happened, in call order
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl PageFetcher for MockPages {
    async fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        self.calls.lock().unwrap().push((url.to_string(), Instant::now()));
        self.pages.get(url).cloned().ok_or_else(|| SourceError::Http {
            status: 404,
            url: url.to_string(),
        })
    }
}

/// Default settings without pacing delays
pub fn quiet_config() -> EnrichmentConfig {
    EnrichmentConfig {
        batch_delay_secs: 0.0,
        item_delay_secs: 0.0,
        ..EnrichmentConfig::default()
    }
}

pub const ATTENTION_ID: &str = "1706.03762";
pub const BERT_URL: &str = "https://aclanthology.org/N19-1423/";

pub fn attention_meta() -> PaperMetadata {
    PaperMetadata {
        title: Some("Attention Is All You Need".to_string()),
        summary: Some("Recurrence is not needed. Attention suffices. Training is fast.".to_string()),
        date: Some("2017-06-12".to_string()),
        authors: Some(vec!["Ashish Vaswani".to_string(), "Noam Shazeer".to_string()]),
    }
}

pub const BERT_PAGE: &str = r#"<html><body>
    <p class="lead">
      <a href="/people/j/jacob-devlin/">Jacob Devlin</a>,
      <a href="/people/m/ming-wei-chang/">Ming-Wei Chang</a>
    </p>
    <div class="card-body acl-abstract"><h5 class="card-title">Abstract</h5>
      <span>We introduce BERT. It is bidirectional.</span>
    </div>
</body></html>"#;

/// Six items over two categories:
/// - two entries for the same arXiv paper (abs and versioned pdf)
/// - one already-enriched arXiv paper
/// - one anthology paper
/// - one paper on an arbitrary host with a year in its path
/// - one repo
pub const CATALOG_JSON: &str = r#"{
  "metadata": { "total_items": 0, "generated": "2024-05-01" },
  "categories": [
    {
      "name": "Transformers",
      "items": [
        { "title": "Attention", "url": "https://arxiv.org/abs/1706.03762", "type": "paper", "stars": 12 },
        { "title": "BERT", "url": "https://aclanthology.org/N19-1423/", "type": "paper" },
        { "title": "Known", "url": "https://arxiv.org/abs/2001.00001", "type": "paper",
          "summary": "Already here.", "date": "2020-01-01", "authors": ["X. Known"] }
      ]
    },
    {
      "name": "Reading",
      "items": [
        { "title": "Attention (pdf)", "url": "https://arxiv.org/pdf/1706.03762v5", "type": "paper" },
        { "title": "Misc", "url": "https://example.com/papers/2019/thing.pdf", "type": "paper" },
        { "title": "A repo", "url": "https://github.com/x/y", "type": "repo" }
      ]
    }
  ]
}"#;

pub fn sample_catalog() -> Catalog {
    serde_json::from_str(CATALOG_JSON).unwrap()
}
