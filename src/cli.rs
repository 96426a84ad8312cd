//! CLI argument definitions using clap derive macros.

use clap::Parser;

use crate::config::RawOptions;
use crate::download::DEFAULT_CONCURRENCY;

/// Find and download Microsoft patches for a security bulletin.
///
/// Searches Microsoft Technet (default) or Google Custom Search for a
/// bulletin or KB keyword, extracts .msu download links from the result
/// pages, and prints them or downloads them to a directory.
#[derive(Parser, Debug)]
#[command(name = "msu-finder")]
#[command(author, version, about)]
pub struct Args {
    /// Search keyword, e.g. a bulletin ID (MS15-100) or KB number
    #[arg(short = 'q', long = "query")]
    pub query: Option<String>,

    /// Search engine: technet or google
    #[arg(short = 's', long = "search-engine")]
    pub search_engine: Option<String>,

    /// Custom regular expression for extracting download links
    #[arg(short = 'r', long = "regex")]
    pub regex: Option<String>,

    /// Google Custom Search API key (required with --search-engine google)
    #[arg(long = "apikey")]
    pub api_key: Option<String>,

    /// Google Custom Search engine ID (required with --search-engine google)
    #[arg(long = "cx")]
    pub search_engine_id: Option<String>,

    /// Destination directory; when set, downloads files instead of
    /// printing links
    #[arg(short = 'd', long = "dir")]
    pub dir: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long)]
    pub quiet: bool,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,
}

impl Args {
    /// Collects the retrieval-relevant options for config resolution.
    /// Output and concurrency flags are handled separately and never
    /// affect validation.
    #[must_use]
    pub fn raw_options(&self) -> RawOptions {
        RawOptions {
            keyword: self.query.clone(),
            search_engine: self.search_engine.clone(),
            link_pattern: self.regex.clone(),
            api_key: self.api_key.clone(),
            search_engine_id: self.search_engine_id.clone(),
            dest_dir: self.dir.clone(),
        }
    }
}
