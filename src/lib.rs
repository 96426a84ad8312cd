//! msu-finder Core Library
//!
//! Finds Microsoft security patches (.msu packages) for a given bulletin
//! or KB keyword and either reports their download links or downloads
//! them in bulk.
//!
//! # Architecture
//!
//! The pipeline runs in four stages, each with its own module:
//! - [`config`] - Option validation and resolved run configuration
//! - [`search`] - Keyword search backends (Technet, Google Custom Search)
//! - [`extract`] - Regex link extraction from result pages
//! - [`download`] - Streaming HTTP downloads with bounded concurrency
//!
//! The [`orchestrator`] module ties the stages together for one run.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod download;
pub mod extract;
pub mod orchestrator;
pub mod search;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, Credentials, RawOptions, RetrievalConfig, SearchEngine};
pub use download::{
    BatchDownloader, BatchOutcome, DEFAULT_CONCURRENCY, DownloadError, DownloadOutcome, Fetcher,
    HttpClient, LinkResult,
};
pub use extract::{DEFAULT_LINK_PATTERN, LinkExtractor};
pub use orchestrator::{Orchestrator, RunError, RunOutcome};
pub use search::{ResultPage, SearchBackend, SearchError};
