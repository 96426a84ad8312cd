//! Search backends that answer a keyword query with result pages.
//!
//! A [`SearchBackend`] turns a keyword into a sequence of [`ResultPage`]s in
//! discovery order; the link extractor then derives download URLs from each
//! page body. Two backends are provided:
//!
//! - [`TechnetBackend`] - Microsoft Technet security bulletin search (default)
//! - [`GoogleBackend`] - Google Custom Search JSON API (requires credentials)
//!
//! Backend selection is an exhaustive match on [`SearchEngine`]; the
//! orchestrator treats backends polymorphically through `Box<dyn SearchBackend>`.

mod error;
mod google;
mod technet;

pub use error::SearchError;
pub use google::GoogleBackend;
pub use technet::TechnetBackend;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::{ConfigError, RetrievalConfig, SearchEngine};
use crate::user_agent;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// One search result: the page URL and its fetched body.
#[derive(Debug, Clone)]
pub struct ResultPage {
    /// Where the page was fetched from.
    pub url: String,
    /// The page body, as text.
    pub body: String,
}

/// Trait that all search backends implement.
///
/// # Object Safety
///
/// Uses `async_trait` to support dynamic dispatch via `Box<dyn SearchBackend>`.
/// Rust 2024 native async traits are not object-safe, so `async_trait` is
/// required for engine-polymorphic orchestration.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Returns the backend's name ("technet" or "google").
    fn name(&self) -> &'static str;

    /// Runs a keyword search and returns result pages in discovery order.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure, auth rejection, error
    /// status, or an uninterpretable response. Any error is fatal to the
    /// run; no retry happens at this layer.
    async fn search(&self, keyword: &str) -> Result<Vec<ResultPage>, SearchError>;
}

/// Constructs the backend selected by the configuration.
///
/// # Errors
///
/// Returns [`ConfigError::MissingArgument`] if the configuration selects
/// Google without credentials (cannot happen for a resolver-produced
/// config), or [`SearchError`] wrapped construction failures surface as the
/// backend's own error on first use.
pub fn backend_for(config: &RetrievalConfig) -> Result<Box<dyn SearchBackend>, ConfigError> {
    match config.engine {
        SearchEngine::Technet => {
            debug!("selected technet backend");
            Ok(Box::new(TechnetBackend::new()))
        }
        SearchEngine::Google => {
            let credentials = config.credentials.clone().ok_or_else(|| {
                ConfigError::missing_argument("no API key set for Google")
            })?;
            debug!("selected google backend");
            Ok(Box::new(GoogleBackend::new(credentials)))
        }
    }
}

/// Builds a backend HTTP client using shared project policy.
///
/// # Errors
///
/// Returns [`SearchError::ClientBuild`] when client construction fails.
pub(crate) fn build_search_http_client(backend: &'static str) -> Result<Client, SearchError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .user_agent(user_agent::default_user_agent())
        .gzip(true)
        .build()
        .map_err(|e| SearchError::client_build(backend, &e))
}

/// Fetches one result page body, mapping failures to [`SearchError`].
pub(crate) async fn fetch_result_page(
    client: &Client,
    url: &str,
) -> Result<ResultPage, SearchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SearchError::network(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::http_status(url, status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SearchError::network(url, &e))?;

    debug!(url = %url, bytes = body.len(), "fetched result page");

    Ok(ResultPage {
        url: url.to_string(),
        body,
    })
}
