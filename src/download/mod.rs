//! File download engine: HTTP transfers with streaming writes, filename
//! resolution, and a concurrency-bounded batch runner.
//!
//! The pieces:
//! - [`HttpClient`] / [`Fetcher`]: a single-file transfer (streamed to
//!   disk, named from `Content-Disposition` or the URL)
//! - [`BatchDownloader`]: runs a whole link set with bounded parallelism
//!   and per-link failure isolation
//! - [`DownloadError`]: typed failures for a single transfer

mod batch;
mod client;
mod error;
mod filename;

pub use batch::{
    BatchDownloader, BatchError, BatchOutcome, DEFAULT_CONCURRENCY, DownloadOutcome, LinkResult,
};
pub use client::{Fetcher, HttpClient};
pub use error::DownloadError;
