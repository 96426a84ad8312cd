//! Batch downloader with bounded concurrency and per-link failure isolation.
//!
//! The [`BatchDownloader`] retrieves every link in a link set, limiting
//! concurrent transfers with a semaphore. One link's failure never aborts
//! the batch; the aggregate [`BatchOutcome`] is always returned, with
//! results in input order regardless of completion order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::Fetcher;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Reason recorded for a link whose transfer never ran or was interrupted.
const CANCELLED_REASON: &str = "cancelled";

/// Error type for batch downloader construction.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Result of one link's transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was written to this local path.
    Succeeded(PathBuf),
    /// The transfer failed; the reason is the rendered error.
    Failed(String),
}

/// One link paired with its transfer outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkResult {
    /// The download URL that was attempted.
    pub url: String,
    /// What happened.
    pub outcome: DownloadOutcome,
}

/// Aggregate outcome of a batch run: per-link results in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    results: Vec<LinkResult>,
}

impl BatchOutcome {
    /// Per-link results, ordered to match the input link set.
    #[must_use]
    pub fn results(&self) -> &[LinkResult] {
        &self.results
    }

    /// Number of links that downloaded successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, DownloadOutcome::Succeeded(_)))
            .count()
    }

    /// Number of links that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Total number of links attempted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true for an empty (no-op) batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Retrieves every link in a link set to a destination directory.
///
/// # Concurrency Model
///
/// - Each transfer runs in its own Tokio task
/// - A semaphore permit is acquired before starting each transfer
/// - Permits are released automatically when transfers complete (RAII)
/// - Outcome slots are indexed by input position, so report order never
///   depends on completion order
///
/// # Cancellation
///
/// A run-scoped [`CancellationToken`] stops new transfers from starting
/// and records `Failed("cancelled")` for pending and in-flight links.
pub struct BatchDownloader {
    fetcher: Arc<dyn Fetcher>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl BatchDownloader {
    /// Creates a new batch downloader.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] if `concurrency` is
    /// outside the valid range (1-100).
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Result<Self, BatchError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(BatchError::InvalidConcurrency { value: concurrency });
        }

        debug!(concurrency, "creating batch downloader");

        Ok(Self {
            fetcher,
            concurrency,
            cancel,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Downloads every link into `dest_dir` and returns the aggregate
    /// outcome. Individual failures are recorded, never propagated; the
    /// outcome is returned even if every link failed.
    #[instrument(skip(self, links), fields(links = links.len(), dest_dir = %dest_dir.display()))]
    pub async fn run(&self, links: &[String], dest_dir: &Path) -> BatchOutcome {
        if links.is_empty() {
            debug!("empty link set; nothing to download");
            return BatchOutcome::default();
        }

        info!("starting batch download");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(links.len());

        for url in links {
            let url = url.clone();
            let dest_dir = dest_dir.to_path_buf();
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                let outcome = transfer_one(&*fetcher, &url, &dest_dir, &semaphore, &cancel).await;
                LinkResult { url, outcome }
            }));
        }

        // Handles are in input order, so awaiting in order yields an
        // ordered outcome while transfers still overlap freely.
        let mut results = Vec::with_capacity(links.len());
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(url = %links[index], error = %e, "download task panicked");
                    results.push(LinkResult {
                        url: links[index].clone(),
                        outcome: DownloadOutcome::Failed("download task panicked".to_string()),
                    });
                }
            }
        }

        let outcome = BatchOutcome { results };
        info!(
            completed = outcome.succeeded(),
            failed = outcome.failed(),
            total = outcome.len(),
            "batch download complete"
        );
        outcome
    }
}

impl std::fmt::Debug for BatchDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDownloader")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Runs one transfer under the semaphore, honoring cancellation before and
/// during the fetch.
async fn transfer_one(
    fetcher: &dyn Fetcher,
    url: &str,
    dest_dir: &Path,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
) -> DownloadOutcome {
    if cancel.is_cancelled() {
        return DownloadOutcome::Failed(CANCELLED_REASON.to_string());
    }

    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(_) => return DownloadOutcome::Failed(CANCELLED_REASON.to_string()),
    };

    if cancel.is_cancelled() {
        return DownloadOutcome::Failed(CANCELLED_REASON.to_string());
    }

    tokio::select! {
        () = cancel.cancelled() => {
            debug!(url = %url, "transfer cancelled mid-flight");
            DownloadOutcome::Failed(CANCELLED_REASON.to_string())
        }
        result = fetcher.fetch(url, dest_dir) => match result {
            Ok(path) => {
                info!(url = %url, path = %path.display(), "download completed");
                DownloadOutcome::Succeeded(path)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "download failed");
                DownloadOutcome::Failed(e.to_string())
            }
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::DownloadError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use tempfile::TempDir;

    /// Fetch stub that fails for URLs in a configured set.
    struct StubFetcher {
        failing: HashSet<String>,
    }

    impl StubFetcher {
        fn all_succeed() -> Self {
            Self {
                failing: HashSet::new(),
            }
        }

        fn failing_on(urls: &[&str]) -> Self {
            Self {
                failing: urls.iter().map(|&u| u.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
            if self.failing.contains(url) {
                return Err(DownloadError::http_status(url, 500));
            }
            Ok(dest_dir.join(url.rsplit('/').next().unwrap_or("file")))
        }
    }

    fn links(names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|n| format!("https://d.example/{n}.msu"))
            .collect()
    }

    fn downloader(fetcher: Arc<dyn Fetcher>) -> BatchDownloader {
        BatchDownloader::new(fetcher, DEFAULT_CONCURRENCY, CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_new_invalid_concurrency_zero() {
        let result = BatchDownloader::new(
            Arc::new(StubFetcher::all_succeed()),
            0,
            CancellationToken::new(),
        );
        assert!(matches!(
            result,
            Err(BatchError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_new_invalid_concurrency_too_high() {
        let result = BatchDownloader::new(
            Arc::new(StubFetcher::all_succeed()),
            101,
            CancellationToken::new(),
        );
        assert!(matches!(
            result,
            Err(BatchError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_new_valid_concurrency_bounds() {
        for value in [1, DEFAULT_CONCURRENCY, 100] {
            let downloader = BatchDownloader::new(
                Arc::new(StubFetcher::all_succeed()),
                value,
                CancellationToken::new(),
            )
            .unwrap();
            assert_eq!(downloader.concurrency(), value);
        }
    }

    #[tokio::test]
    async fn test_run_empty_links_is_noop() {
        let dir = TempDir::new().unwrap();
        let outcome = downloader(Arc::new(StubFetcher::all_succeed()))
            .run(&[], dir.path())
            .await;
        assert!(outcome.is_empty());
        assert_eq!(outcome.succeeded(), 0);
        assert_eq!(outcome.failed(), 0);
    }

    #[tokio::test]
    async fn test_run_all_succeed() {
        let dir = TempDir::new().unwrap();
        let input = links(&["a", "b", "c"]);
        let outcome = downloader(Arc::new(StubFetcher::all_succeed()))
            .run(&input, dir.path())
            .await;
        assert_eq!(outcome.succeeded(), 3);
        assert_eq!(outcome.failed(), 0);
    }

    #[tokio::test]
    async fn test_run_isolates_failures_and_counts() {
        let dir = TempDir::new().unwrap();
        let input = links(&["a", "b", "c", "d", "e"]);
        let failing = StubFetcher::failing_on(&[&input[1], &input[3]]);
        let outcome = downloader(Arc::new(failing)).run(&input, dir.path()).await;

        assert_eq!(outcome.succeeded(), 3);
        assert_eq!(outcome.failed(), 2);
        assert!(matches!(
            outcome.results()[1].outcome,
            DownloadOutcome::Failed(_)
        ));
        assert!(matches!(
            outcome.results()[3].outcome,
            DownloadOutcome::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_run_failure_positions_do_not_matter() {
        let dir = TempDir::new().unwrap();
        let input = links(&["a", "b", "c"]);
        for failing_index in 0..input.len() {
            let failing = StubFetcher::failing_on(&[&input[failing_index]]);
            let outcome = downloader(Arc::new(failing)).run(&input, dir.path()).await;
            assert_eq!(outcome.failed(), 1, "index {failing_index}");
            assert_eq!(outcome.succeeded(), 2, "index {failing_index}");
            assert!(
                matches!(
                    outcome.results()[failing_index].outcome,
                    DownloadOutcome::Failed(_)
                ),
                "index {failing_index}"
            );
        }
    }

    #[tokio::test]
    async fn test_run_preserves_input_order() {
        let dir = TempDir::new().unwrap();
        let input = links(&["z", "a", "m", "q"]);
        let outcome = downloader(Arc::new(StubFetcher::all_succeed()))
            .run(&input, dir.path())
            .await;
        let reported: Vec<&str> = outcome.results().iter().map(|r| r.url.as_str()).collect();
        let expected: Vec<&str> = input.iter().map(String::as_str).collect();
        assert_eq!(reported, expected);
    }

    #[tokio::test]
    async fn test_run_all_fail_still_returns_outcome() {
        let dir = TempDir::new().unwrap();
        let input = links(&["a", "b"]);
        let failing = StubFetcher::failing_on(&[&input[0], &input[1]]);
        let outcome = downloader(Arc::new(failing)).run(&input, dir.path()).await;
        assert_eq!(outcome.failed(), 2);
        assert_eq!(outcome.succeeded(), 0);
    }

    #[tokio::test]
    async fn test_run_cancelled_before_start_marks_all_cancelled() {
        let dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let downloader =
            BatchDownloader::new(Arc::new(StubFetcher::all_succeed()), 2, cancel).unwrap();

        let input = links(&["a", "b", "c"]);
        let outcome = downloader.run(&input, dir.path()).await;

        assert_eq!(outcome.failed(), 3);
        for result in outcome.results() {
            assert_eq!(
                result.outcome,
                DownloadOutcome::Failed("cancelled".to_string())
            );
        }
    }

    #[tokio::test]
    async fn test_failed_reason_carries_error_text() {
        let dir = TempDir::new().unwrap();
        let input = links(&["a"]);
        let failing = StubFetcher::failing_on(&[&input[0]]);
        let outcome = downloader(Arc::new(failing)).run(&input, dir.path()).await;
        match &outcome.results()[0].outcome {
            DownloadOutcome::Failed(reason) => {
                assert!(reason.contains("500"), "got: {reason}");
            }
            other => panic!("expected Failed, got: {other:?}"),
        }
    }
}
