//! arXiv export API client
//!
//! Queries `id_list=<ids>&max_results=<n>` and reads the Atom feed that comes
//! back. Per entry: id, title, summary (first three sentences), published day
//! and author names.

use super::{ArxivFetcher, ArxivResults, PaperMetadata, SourceError};
use crate::extract::{arxiv_id_from_entry, clean_title, truncate_to_sentences, MAX_SENTENCES};
use async_trait::async_trait;
use kbase_common::config::EnrichmentConfig;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

/// arXiv API client
pub struct ArxivClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl ArxivClient {
    pub fn new(config: &EnrichmentConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.bulk_timeout())
            .build()?;

        Ok(Self {
            http_client,
            api_url: config.arxiv_api_url.clone(),
        })
    }

    /// Title of a single paper, `[id]` prefix removed
    pub async fn fetch_title(&self, id: &str) -> Result<Option<String>, SourceError> {
        let mut results = self.fetch_batch(&[id.to_string()]).await?;
        Ok(results.remove(id).and_then(|meta| meta.title))
    }
}

#[async_trait]
impl ArxivFetcher for ArxivClient {
    async fn fetch_batch(&self, ids: &[String]) -> Result<ArxivResults, SourceError> {
        let id_list = ids.join(",");
        let max_results = ids.len().to_string();
        debug!(count = ids.len(), url = %self.api_url, "Querying arXiv API");

        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[
                ("id_list", id_list.as_str()),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url: self.api_url.clone(),
            });
        }

        let body = response.text().await?;
        parse_feed(&body)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

#[derive(Default)]
struct EntryAccum {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    authors: Vec<String>,
}

impl EntryAccum {
    fn set(&mut self, field: Field, text: String) {
        match field {
            Field::Id => self.id = Some(text),
            Field::Title => self.title = Some(text),
            Field::Summary => self.summary = Some(text),
            Field::Published => self.published = Some(text),
            Field::AuthorName => {
                let name = text.trim();
                if !name.is_empty() {
                    self.authors.push(name.to_string());
                }
            }
        }
    }

    fn finish(self) -> Option<(String, PaperMetadata)> {
        let id = arxiv_id_from_entry(self.id.as_deref()?.trim())?;
        let metadata = PaperMetadata {
            title: self.title.map(|t| clean_title(&t)),
            summary: self
                .summary
                .map(|s| truncate_to_sentences(s.trim(), MAX_SENTENCES)),
            date: self.published.map(|p| p.trim().chars().take(10).collect()),
            authors: (!self.authors.is_empty()).then_some(self.authors),
        };
        Some((id, metadata))
    }
}

/// Parse an arXiv Atom feed into per-id metadata
///
/// Entries without a recognisable id (e.g. API error entries) are skipped.
pub fn parse_feed(xml: &str) -> Result<ArxivResults, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut results = ArxivResults::new();
    let mut entry: Option<EntryAccum> = None;
    let mut in_author = false;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match (name.as_ref(), entry.is_some()) {
                    (b"entry", _) => entry = Some(EntryAccum::default()),
                    (b"author", true) => in_author = true,
                    (b"id", true) if !in_author => field = Some(Field::Id),
                    (b"title", true) => field = Some(Field::Title),
                    (b"summary", true) => field = Some(Field::Summary),
                    (b"published", true) => field = Some(Field::Published),
                    (b"name", true) if in_author => field = Some(Field::AuthorName),
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| SourceError::Parse(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"entry" => {
                        if let Some((id, metadata)) = entry.take().and_then(EntryAccum::finish) {
                            results.insert(id, metadata);
                        }
                        in_author = false;
                    }
                    b"author" => in_author = false,
                    _ => {
                        if let (Some(accum), Some(f)) = (entry.as_mut(), field.take()) {
                            accum.set(f, std::mem::take(&mut text));
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::Parse(format!(
                    "Feed error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: id_list=1706.03762,2402.12329</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>  The dominant models are recurrent.
      We propose the Transformer. It is   simpler. It trains faster. It wins.
    </summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name><arxiv:affiliation xmlns:arxiv="http://arxiv.org/schemas/atom">Google</arxiv:affiliation></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2402.12329v1</id>
    <published>2024-02-19T18:59:59Z</published>
    <title>Query &amp; Answer</title>
    <summary>Short.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_entries() {
        let results = parse_feed(FEED).unwrap();
        assert_eq!(results.len(), 2);

        let attention = &results["1706.03762"];
        assert_eq!(attention.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(
            attention.summary.as_deref(),
            Some("The dominant models are recurrent. We propose the Transformer. It is simpler.")
        );
        assert_eq!(attention.date.as_deref(), Some("2017-06-12"));
        assert_eq!(
            attention.authors,
            Some(vec!["Ashish Vaswani".to_string(), "Noam Shazeer".to_string()])
        );
    }

    #[test]
    fn test_entry_without_authors_has_null_authors() {
        let results = parse_feed(FEED).unwrap();
        let entry = &results["2402.12329"];

        assert_eq!(entry.title.as_deref(), Some("Query & Answer"));
        assert_eq!(entry.summary.as_deref(), Some("Short."));
        assert_eq!(entry.date.as_deref(), Some("2024-02-19"));
        assert_eq!(entry.authors, None);
    }

    #[test]
    fn test_error_entries_skipped() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <entry>
              <id>http://arxiv.org/api/errors#incorrect_id_format_for_abc</id>
              <title>Error</title>
              <summary>incorrect id format for abc</summary>
            </entry>
        </feed>"#;
        assert!(parse_feed(feed).unwrap().is_empty());
    }

    #[test]
    fn test_empty_feed() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>ArXiv Query</title></feed>"#;
        assert!(parse_feed(feed).unwrap().is_empty());
    }

    #[test]
    fn test_broken_feed_is_parse_error() {
        let err = parse_feed("<feed><entry><id>x</entry></feed>").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_client_creation() {
        assert!(ArxivClient::new(&EnrichmentConfig::default()).is_ok());
    }
}
