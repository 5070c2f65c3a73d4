//! Batch scheduler for bulk arXiv queries
//!
//! Ids are split into fixed-size chunks and sent strictly one after another,
//! with a fixed pause between chunks and none after the last. The pause is
//! the whole rate limiter: the upstream limit is undocumented, so requests
//! are paced rather than run concurrently.
//!
//! A failed chunk is logged and yields no results; later chunks still run.

use crate::sources::{ArxivFetcher, ArxivResults};
use kbase_common::config::EnrichmentConfig;
use std::time::Duration;
use tracing::{info, warn};

/// Result of one chunk
#[derive(Debug)]
pub struct BatchOutcome {
    /// 1-based position
    pub number: usize,
    pub ids: Vec<String>,
    /// Empty when the chunk failed
    pub results: ArxivResults,
    pub error: Option<String>,
}

/// Sequential, paced chunk runner
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    batch_size: usize,
    delay: Duration,
}

impl BatchScheduler {
    /// `batch_size` is clamped to at least 1
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            delay,
        }
    }

    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self::new(config.batch_size, config.batch_delay())
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run every chunk through `fetcher`, in order
    pub async fn run(&self, ids: &[String], fetcher: &dyn ArxivFetcher) -> Vec<BatchOutcome> {
        let chunks: Vec<&[String]> = ids.chunks(self.batch_size).collect();
        let mut outcomes = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            let number = i + 1;
            info!("Fetching arxiv batch {} ({} papers)", number, chunk.len());

            let outcome = match fetcher.fetch_batch(chunk).await {
                Ok(results) => BatchOutcome {
                    number,
                    ids: chunk.to_vec(),
                    results,
                    error: None,
                },
                Err(e) => {
                    warn!("Error fetching arxiv batch {}: {}", number, e);
                    BatchOutcome {
                        number,
                        ids: chunk.to_vec(),
                        results: ArxivResults::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);

            if number < chunks.len() && !self.delay.is_zero() {
                info!("Waiting {:?} before next batch", self.delay);
                tokio::time::sleep(self.delay).await;
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{PaperMetadata, SourceError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Records chunk sizes and call times; fails chunks listed in `fail`
    struct RecordingFetcher {
        calls: Mutex<Vec<(usize, Instant)>>,
        fail: Vec<usize>,
    }

    impl RecordingFetcher {
        fn new(fail: Vec<usize>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl ArxivFetcher for RecordingFetcher {
        async fn fetch_batch(&self, ids: &[String]) -> Result<ArxivResults, SourceError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((ids.len(), Instant::now()));
                calls.len()
            };
            if self.fail.contains(&call) {
                return Err(SourceError::Network("connection reset".to_string()));
            }
            Ok(ids
                .iter()
                .map(|id| (id.clone(), PaperMetadata::default()))
                .collect())
        }
    }

    /// Paused clock advances in whole timer ticks
    fn assert_about(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(5),
            "expected about {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("2401.{:05}", i)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_125_ids_make_three_paced_batches() {
        let fetcher = RecordingFetcher::new(vec![]);
        let scheduler = BatchScheduler::new(50, Duration::from_secs(3));
        let start = Instant::now();

        let outcomes = scheduler.run(&ids(125), &fetcher).await;
        let finished = start.elapsed();

        let calls = fetcher.calls.lock().unwrap().clone();
        let sizes: Vec<usize> = calls.iter().map(|(n, _)| *n).collect();
        assert_eq!(sizes, vec![50, 50, 25]);

        assert_about(calls[0].1 - start, Duration::ZERO);
        assert_about(calls[1].1 - calls[0].1, Duration::from_secs(3));
        assert_about(calls[2].1 - calls[1].1, Duration::from_secs(3));
        // no pause after the last batch
        assert_about(finished, Duration::from_secs(6));

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[2].number, 3);
        assert_eq!(outcomes[2].results.len(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_batch_does_not_stop_later_batches() {
        let fetcher = RecordingFetcher::new(vec![1]);
        let scheduler = BatchScheduler::new(2, Duration::from_secs(3));

        let outcomes = scheduler.run(&ids(5), &fetcher).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].error.is_some());
        assert!(outcomes[0].results.is_empty());
        assert_eq!(outcomes[0].ids.len(), 2);
        assert!(outcomes[1].error.is_none());
        assert_eq!(outcomes[1].results.len(), 2);
        assert_eq!(outcomes[2].results.len(), 1);
    }

    #[tokio::test]
    async fn test_no_ids_no_requests() {
        let fetcher = RecordingFetcher::new(vec![]);
        let outcomes = BatchScheduler::new(50, Duration::from_secs(3))
            .run(&[], &fetcher)
            .await;

        assert!(outcomes.is_empty());
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        assert_eq!(BatchScheduler::new(0, Duration::ZERO).batch_size(), 1);
    }
}
