//! Google Custom Search backend.
//!
//! Queries the Google Custom Search JSON API with the configured API key and
//! search engine ID, follows `nextPage` pagination up to a fixed cap, then
//! fetches each result item's page as a result page.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Credentials;

use super::{ResultPage, SearchBackend, SearchError, build_search_http_client, fetch_result_page};

/// Default Google API base URL.
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// Maximum number of result pages to walk.
const MAX_INDEX_PAGES: usize = 10;

// ==================== Custom Search API Response Types ====================

/// Top-level Custom Search response.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleSearchResponse {
    #[serde(default)]
    pub queries: Option<GoogleQueries>,
    #[serde(default)]
    pub items: Option<Vec<GoogleItem>>,
}

/// The `queries` object; `nextPage` is present while more results remain.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleQueries {
    #[serde(rename = "nextPage", default)]
    pub next_page: Option<Vec<GoogleNextPage>>,
}

/// One `nextPage` entry carrying the next start index.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleNextPage {
    #[serde(rename = "startIndex")]
    pub start_index: u32,
}

/// One search result item.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleItem {
    pub link: String,
}

// ==================== GoogleBackend ====================

/// Searches via the Google Custom Search JSON API.
pub struct GoogleBackend {
    client: Result<Client, SearchError>,
    base_url: String,
    credentials: Credentials,
}

impl GoogleBackend {
    /// Creates a backend against the public Google API.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Creates a backend with a custom base URL (for testing with wiremock).
    #[must_use]
    pub fn with_base_url(credentials: Credentials, base_url: impl Into<String>) -> Self {
        Self {
            client: build_search_http_client("google"),
            base_url: base_url.into(),
            credentials,
        }
    }

    fn client(&self) -> Result<&Client, SearchError> {
        self.client.as_ref().map_err(Clone::clone)
    }

    fn query_url(&self, keyword: &str, start_index: u32) -> String {
        format!(
            "{}/customsearch/v1?key={}&cx={}&q={}&start={start_index}",
            self.base_url,
            urlencoding::encode(&self.credentials.api_key),
            urlencoding::encode(&self.credentials.search_engine_id),
            urlencoding::encode(keyword),
        )
    }

    async fn fetch_index_page(
        &self,
        keyword: &str,
        start_index: u32,
    ) -> Result<GoogleSearchResponse, SearchError> {
        let client = self.client()?;
        let url = self.query_url(keyword, start_index);

        debug!(start_index, "querying custom search API");

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| SearchError::network(&url, &e))?;

        let status = response.status();
        if matches!(status.as_u16(), 400 | 401 | 403) {
            let reason = response
                .text()
                .await
                .unwrap_or_else(|_| "no response body".to_string());
            return Err(SearchError::auth(status.as_u16(), truncate(&reason, 200)));
        }
        if !status.is_success() {
            return Err(SearchError::http_status(&url, status.as_u16()));
        }

        response.json::<GoogleSearchResponse>().await.map_err(|e| {
            warn!(error = %e, "failed to parse custom search response");
            SearchError::unexpected("google", "search response was not valid JSON")
        })
    }
}

impl std::fmt::Debug for GoogleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials stay out of Debug output.
        f.debug_struct("GoogleBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchBackend for GoogleBackend {
    fn name(&self) -> &'static str {
        "google"
    }

    #[tracing::instrument(skip(self), fields(backend = "google"))]
    async fn search(&self, keyword: &str) -> Result<Vec<ResultPage>, SearchError> {
        let client = self.client()?;

        let mut links = Vec::new();
        let mut start_index = 1u32;

        for _ in 0..MAX_INDEX_PAGES {
            let response = self.fetch_index_page(keyword, start_index).await?;

            if let Some(items) = &response.items {
                links.extend(items.iter().map(|item| item.link.clone()));
            }

            let Some(next) = response
                .queries
                .as_ref()
                .and_then(|q| q.next_page.as_ref())
                .and_then(|pages| pages.first())
            else {
                break;
            };
            start_index = next.start_index;
        }

        debug!(result_count = links.len(), "custom search walk complete");

        let mut pages = Vec::with_capacity(links.len());
        for link in &links {
            pages.push(fetch_result_page(client, link).await?);
        }

        Ok(pages)
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
