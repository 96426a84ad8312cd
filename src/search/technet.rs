//! Technet security bulletin search backend.
//!
//! Queries the Technet `GetBulletins` JSON service for bulletins matching a
//! keyword, then fetches each bulletin's detail page as a result page. The
//! detail pages carry the patch download links the extractor is after.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ResultPage, SearchBackend, SearchError, build_search_http_client, fetch_result_page};

/// Default Technet base URL.
const DEFAULT_BASE_URL: &str = "https://technet.microsoft.com";

/// Bulletins requested per index query.
const BULLETINS_PER_PAGE: u32 = 100;

// ==================== Technet Service Response Types ====================

/// Top-level response from the `GetBulletins` service.
#[derive(Debug, Deserialize)]
pub(crate) struct BulletinIndex {
    /// Total bulletin count for the query.
    #[serde(rename = "l", default)]
    pub total: Option<u32>,
    /// The bulletins on this page.
    #[serde(rename = "b", default)]
    pub bulletins: Vec<Bulletin>,
}

/// One bulletin entry from the index.
#[derive(Debug, Deserialize)]
pub(crate) struct Bulletin {
    /// Bulletin ID, e.g. "MS15-100".
    #[serde(rename = "Id")]
    pub id: String,
    /// Associated KB number, when present.
    #[serde(rename = "KB", default)]
    pub kb: Option<String>,
}

// ==================== TechnetBackend ====================

/// Searches Technet security bulletins by keyword.
pub struct TechnetBackend {
    client: Result<Client, SearchError>,
    base_url: String,
}

impl TechnetBackend {
    /// Creates a backend against the public Technet service.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a backend with a custom base URL (for testing with wiremock).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: build_search_http_client("technet"),
            base_url: base_url.into(),
        }
    }

    fn client(&self) -> Result<&Client, SearchError> {
        self.client.as_ref().map_err(Clone::clone)
    }

    fn index_url(&self, keyword: &str) -> String {
        let encoded = urlencoding::encode(keyword);
        format!(
            "{}/security/bulletin/services/GetBulletins?searchText={encoded}\
             &sortField=0&sortOrder=1&currentPage=1&bulletinsPerPage={BULLETINS_PER_PAGE}&locale=en-us",
            self.base_url
        )
    }

    fn bulletin_page_url(&self, bulletin_id: &str) -> String {
        format!(
            "{}/en-us/library/security/{}.aspx",
            self.base_url,
            bulletin_id.to_lowercase()
        )
    }
}

impl Default for TechnetBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TechnetBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TechnetBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchBackend for TechnetBackend {
    fn name(&self) -> &'static str {
        "technet"
    }

    #[tracing::instrument(skip(self), fields(backend = "technet"))]
    async fn search(&self, keyword: &str) -> Result<Vec<ResultPage>, SearchError> {
        let client = self.client()?;
        let url = self.index_url(keyword);

        debug!(index_url = %url, "querying bulletin index");

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| SearchError::network(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::http_status(&url, status.as_u16()));
        }

        let index = response.json::<BulletinIndex>().await.map_err(|e| {
            warn!(error = %e, "failed to parse bulletin index");
            SearchError::unexpected("technet", "bulletin index was not valid JSON")
        })?;

        debug!(
            bulletins = index.bulletins.len(),
            total = ?index.total,
            "bulletin index retrieved"
        );

        let mut pages = Vec::with_capacity(index.bulletins.len());
        for bulletin in &index.bulletins {
            let page_url = self.bulletin_page_url(&bulletin.id);
            debug!(bulletin = %bulletin.id, kb = ?bulletin.kb, page_url = %page_url, "fetching bulletin page");
            pages.push(fetch_result_page(client, &page_url).await?);
        }

        Ok(pages)
    }
}
