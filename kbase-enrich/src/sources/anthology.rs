//! Anthology-style paper pages
//!
//! One HTML page per paper. The abstract and author links are scraped with
//! fixed patterns; when the upstream markup changes the fields come back
//! null rather than failing the item.

use super::{PageFetcher, SourceError};
use crate::extract::{
    extract_abstract, extract_people_links, first_year, year_to_date, ANTHOLOGY_YEAR_MATCHERS,
};
use async_trait::async_trait;
use kbase_common::config::EnrichmentConfig;
use tracing::debug;

/// What a paper page yielded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub summary: Option<String>,
    pub authors: Option<Vec<String>>,
}

/// Abstract and authors from one downloaded page
pub fn scrape_page(html: &str) -> PageMetadata {
    PageMetadata {
        summary: extract_abstract(html),
        authors: extract_people_links(html),
    }
}

/// Publication date implied by an anthology url (`YYYY-01-01`)
pub fn anthology_date(url: &str) -> Option<String> {
    first_year(url, ANTHOLOGY_YEAR_MATCHERS).map(year_to_date)
}

pub fn is_anthology_url(url: &str, host: &str) -> bool {
    !host.is_empty() && url.contains(host)
}

/// HTTP page downloader with the short per-item timeout
pub struct AnthologyClient {
    http_client: reqwest::Client,
}

impl AnthologyClient {
    pub fn new(config: &EnrichmentConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.item_timeout())
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl PageFetcher for AnthologyClient {
    async fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        debug!(url = %url, "Fetching paper page");
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        // Lossy decode, like a browser would
        let bytes = response.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <h2 id="title"><a href="/2024.emnlp-main.557.pdf">A Paper</a></h2>
        <p class="lead">
          <a href="/people/j/jane-doe/">Jane Doe</a>,
          <a href="/people/r/richard-roe/">Richard Roe</a>
        </p>
        <div class="card-body acl-abstract"><h5 class="card-title">Abstract</h5>
          <span>Models fail. We fix them. Results improve. Code is released.</span>
        </div>
    </body></html>"#;

    #[test]
    fn test_scrape_page() {
        let meta = scrape_page(PAGE);
        assert_eq!(
            meta.summary.as_deref(),
            Some("Models fail. We fix them. Results improve.")
        );
        assert_eq!(
            meta.authors,
            Some(vec!["Jane Doe".to_string(), "Richard Roe".to_string()])
        );
    }

    #[test]
    fn test_changed_markup_yields_nulls() {
        assert_eq!(scrape_page("<html><main>redesigned</main></html>"), PageMetadata::default());
    }

    #[test]
    fn test_anthology_date() {
        assert_eq!(
            anthology_date("https://aclanthology.org/2024.emnlp-main.557/").as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(
            anthology_date("https://aclanthology.org/D15-1013.pdf").as_deref(),
            Some("2015-01-01")
        );
        assert_eq!(anthology_date("https://aclanthology.org/events/acl/"), None);
    }

    #[test]
    fn test_anthology_host_match() {
        assert!(is_anthology_url("https://aclanthology.org/D15-1013", "aclanthology.org"));
        assert!(!is_anthology_url("https://openreview.net/forum?id=x", "aclanthology.org"));
        assert!(!is_anthology_url("https://aclanthology.org/D15-1013", ""));
    }
}
