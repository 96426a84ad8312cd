//! Ties the pipeline together: search, link extraction, then either a
//! link report or a batch download.
//!
//! The orchestrator owns the per-run wiring (backend, extractor, fetcher)
//! and keeps the phases in a fixed order. Search failures abort the run;
//! download failures never do, they are carried in the batch outcome.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::{ConfigError, RetrievalConfig};
use crate::download::{BatchDownloader, BatchError, BatchOutcome, Fetcher, HttpClient};
use crate::extract::LinkExtractor;
use crate::search::{self, SearchBackend, SearchError};

/// Fatal error for a whole run.
///
/// Per-link download failures are not run errors; they live inside
/// [`RunOutcome::Downloaded`].
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Configuration was rejected while wiring the run.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The search phase failed; nothing downstream ran.
    #[error(transparent)]
    Search(#[from] SearchError),
    /// The batch downloader rejected its settings.
    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// What a completed run produced.
#[derive(Debug)]
pub enum RunOutcome {
    /// Report mode: the extracted download links, in discovery order.
    Report(Vec<String>),
    /// Download mode: per-link results for the whole link set.
    Downloaded(BatchOutcome),
}

/// Runs one retrieval: search the selected backend, extract download
/// links, then report or download them depending on the configuration.
pub struct Orchestrator {
    config: RetrievalConfig,
    backend: Box<dyn SearchBackend>,
    extractor: LinkExtractor,
    fetcher: Arc<dyn Fetcher>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Wires a run from a resolved configuration, using the real search
    /// backend and HTTP fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Config`] if the backend cannot be built from
    /// the configuration or the link pattern does not compile.
    pub fn for_config(
        config: RetrievalConfig,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Result<Self, RunError> {
        let backend = search::backend_for(&config)?;
        let extractor = LinkExtractor::new(config.link_pattern.as_deref())?;
        Ok(Self::new(
            config,
            backend,
            extractor,
            Arc::new(HttpClient::new()),
            concurrency,
            cancel,
        ))
    }

    /// Wires a run from explicit parts. Used by [`Self::for_config`] and
    /// by tests substituting stub backends or fetchers.
    #[must_use]
    pub fn new(
        config: RetrievalConfig,
        backend: Box<dyn SearchBackend>,
        extractor: LinkExtractor,
        fetcher: Arc<dyn Fetcher>,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            backend,
            extractor,
            fetcher,
            concurrency,
            cancel,
        }
    }

    /// Executes the run end to end.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Search`] if the search phase fails and
    /// [`RunError::Batch`] for an invalid concurrency setting. An empty
    /// link set is not an error in either mode.
    #[instrument(skip(self), fields(keyword = %self.config.keyword, engine = ?self.config.engine))]
    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        info!(backend = self.backend.name(), "searching");
        let pages = self.backend.search(&self.config.keyword).await?;
        debug!(pages = pages.len(), "search complete");

        let links = self.extractor.extract_all(&pages);
        info!(count = links.len(), "download links found");

        let Some(dest_dir) = &self.config.dest_dir else {
            return Ok(RunOutcome::Report(links));
        };

        let downloader = BatchDownloader::new(
            Arc::clone(&self.fetcher),
            self.concurrency,
            self.cancel.clone(),
        )?;
        let outcome = downloader.run(&links, dest_dir).await;
        Ok(RunOutcome::Downloaded(outcome))
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SearchEngine;
    use crate::download::{DownloadError, DownloadOutcome, DEFAULT_CONCURRENCY};
    use crate::search::ResultPage;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Backend stub serving canned result pages.
    struct StubBackend {
        pages: Vec<ResultPage>,
    }

    #[async_trait]
    impl SearchBackend for StubBackend {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn search(&self, _keyword: &str) -> Result<Vec<ResultPage>, SearchError> {
            Ok(self.pages.clone())
        }
    }

    /// Backend stub that always fails.
    struct FailingBackend;

    #[async_trait]
    impl SearchBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn search(&self, _keyword: &str) -> Result<Vec<ResultPage>, SearchError> {
            Err(SearchError::HttpStatus {
                url: "https://s.example/".to_string(),
                status: 503,
            })
        }
    }

    /// Fetch stub that fails for one URL and succeeds for everything else.
    struct StubFetcher {
        failing_url: Option<String>,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
            if self.failing_url.as_deref() == Some(url) {
                return Err(DownloadError::http_status(url, 404));
            }
            Ok(dest_dir.join(url.rsplit('/').next().unwrap_or("file")))
        }
    }

    fn page(url: &str, body: &str) -> ResultPage {
        ResultPage {
            url: url.to_string(),
            body: body.to_string(),
        }
    }

    fn report_config() -> RetrievalConfig {
        RetrievalConfig {
            keyword: "MS15-011".to_string(),
            engine: SearchEngine::Technet,
            link_pattern: None,
            credentials: None,
            dest_dir: None,
        }
    }

    fn orchestrator(
        config: RetrievalConfig,
        backend: Box<dyn SearchBackend>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Orchestrator {
        Orchestrator::new(
            config,
            backend,
            LinkExtractor::new(None).unwrap(),
            fetcher,
            DEFAULT_CONCURRENCY,
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_report_mode_returns_links_in_order() {
        let backend = StubBackend {
            pages: vec![
                page(
                    "https://s.example/1",
                    r"get https://dl.example/first.msu here",
                ),
                page(
                    "https://s.example/2",
                    r"and https://dl.example/second.msu too",
                ),
            ],
        };
        let orchestrator = orchestrator(
            report_config(),
            Box::new(backend),
            Arc::new(StubFetcher { failing_url: None }),
        );

        match orchestrator.run().await.unwrap() {
            RunOutcome::Report(links) => {
                assert_eq!(
                    links,
                    vec![
                        "https://dl.example/first.msu".to_string(),
                        "https://dl.example/second.msu".to_string(),
                    ]
                );
            }
            other => panic!("expected report, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_mode_empty_link_set_is_not_an_error() {
        let backend = StubBackend {
            pages: vec![page("https://s.example/1", "no links here")],
        };
        let orchestrator = orchestrator(
            report_config(),
            Box::new(backend),
            Arc::new(StubFetcher { failing_url: None }),
        );

        match orchestrator.run().await.unwrap() {
            RunOutcome::Report(links) => assert!(links.is_empty()),
            other => panic!("expected report, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_download_mode_downloads_every_link() {
        let dir = TempDir::new().unwrap();
        let mut config = report_config();
        config.dest_dir = Some(dir.path().to_path_buf());

        let backend = StubBackend {
            pages: vec![page(
                "https://s.example/1",
                r"https://dl.example/a.msu and https://dl.example/b.msu",
            )],
        };
        let orchestrator = orchestrator(
            config,
            Box::new(backend),
            Arc::new(StubFetcher { failing_url: None }),
        );

        match orchestrator.run().await.unwrap() {
            RunOutcome::Downloaded(outcome) => {
                assert_eq!(outcome.succeeded(), 2);
                assert_eq!(outcome.failed(), 0);
            }
            other => panic!("expected downloads, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_download_mode_isolates_single_failure() {
        let dir = TempDir::new().unwrap();
        let mut config = report_config();
        config.dest_dir = Some(dir.path().to_path_buf());

        let backend = StubBackend {
            pages: vec![page(
                "https://s.example/1",
                r"https://dl.example/a.msu https://dl.example/bad.msu https://dl.example/c.msu",
            )],
        };
        let orchestrator = orchestrator(
            config,
            Box::new(backend),
            Arc::new(StubFetcher {
                failing_url: Some("https://dl.example/bad.msu".to_string()),
            }),
        );

        match orchestrator.run().await.unwrap() {
            RunOutcome::Downloaded(outcome) => {
                assert_eq!(outcome.succeeded(), 2);
                assert_eq!(outcome.failed(), 1);
                assert!(matches!(
                    outcome.results()[1].outcome,
                    DownloadOutcome::Failed(_)
                ));
            }
            other => panic!("expected downloads, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_failure_aborts_the_run() {
        let orchestrator = orchestrator(
            report_config(),
            Box::new(FailingBackend),
            Arc::new(StubFetcher { failing_url: None }),
        );

        let error = orchestrator.run().await.unwrap_err();
        assert!(matches!(error, RunError::Search(_)));
    }

    #[tokio::test]
    async fn test_download_mode_empty_link_set_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let mut config = report_config();
        config.dest_dir = Some(dir.path().to_path_buf());

        let backend = StubBackend {
            pages: vec![page("https://s.example/1", "nothing to see")],
        };
        let orchestrator = orchestrator(
            config,
            Box::new(backend),
            Arc::new(StubFetcher { failing_url: None }),
        );

        match orchestrator.run().await.unwrap() {
            RunOutcome::Downloaded(outcome) => assert!(outcome.is_empty()),
            other => panic!("expected downloads, got: {other:?}"),
        }
    }
}
