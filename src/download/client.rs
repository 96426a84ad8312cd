//! HTTP client wrapper for downloading files.
//!
//! Provides [`HttpClient`], which streams a URL's body to a file in the
//! destination directory, and the [`Fetcher`] trait the batch downloader
//! dispatches through so tests can substitute stub transfers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use crate::user_agent;

use super::error::DownloadError;
use super::filename::{
    create_unique_file, fallback_filename_from_url, parse_content_disposition, sanitize_filename,
};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const READ_TIMEOUT_SECS: u64 = 300;

/// A single-file transfer capability.
///
/// # Object Safety
///
/// Uses `async_trait` so the batch downloader can hold `Arc<dyn Fetcher>`
/// and tests can inject stub implementations.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieves `url` into `dest_dir`, returning the written path.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] on transport, status, or filesystem failure.
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, DownloadError>;
}

/// HTTP client for downloading files with streaming support.
///
/// Created once and reused across the batch to take advantage of
/// connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (patch packages can be large)
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(user_agent::default_user_agent())
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Downloads a file from `url` into `dest_dir`.
    ///
    /// The filename is determined by:
    /// 1. Content-Disposition header (if present)
    /// 2. URL path (last segment)
    /// 3. Timestamp-based fallback
    ///
    /// Existing files are never overwritten; a `_N` suffix is inserted
    /// before the extension on collision. Partial files are removed when
    /// the stream fails mid-transfer.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the URL is invalid, the request fails,
    /// the server returns an error status, or writing to disk fails.
    #[must_use = "download result contains the path to the downloaded file"]
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download_to_file(
        &self,
        url: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        debug!("starting download");

        let parsed_url = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition)
            .map(|name| sanitize_filename(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_filename_from_url(&parsed_url));

        // create_new reservation: concurrent transfers deriving the same
        // filename each claim a distinct file.
        let (mut file, file_path) = create_unique_file(dest_dir, &filename)
            .await
            .map_err(|e| DownloadError::io(dest_dir.join(&filename), e))?;
        debug!(filename = %filename, path = %file_path.display(), "resolved output path");

        let stream_result = stream_to_file(&mut file, response, url, &file_path).await;

        if stream_result.is_err() {
            debug!(path = %file_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&file_path).await;
        }

        let bytes_written = stream_result?;

        info!(
            path = %file_path.display(),
            bytes = bytes_written,
            "download complete"
        );

        Ok(file_path)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        self.download_to_file(url, dest_dir).await
    }
}

/// Streams the response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
