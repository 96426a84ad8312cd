//! Configuration resolution for a retrieval run.
//!
//! This module turns raw, unvalidated CLI option values into a
//! [`RetrievalConfig`] or fails fast with a [`ConfigError`] diagnostic.
//! Validation is resolved entirely locally - no network call is ever
//! attempted with an invalid configuration.

mod error;

pub use error::ConfigError;

use std::path::PathBuf;

use regex::Regex;

/// Which search backend implementation a run uses.
///
/// A closed enum matched exhaustively wherever backend-specific behavior
/// (credential requirements, backend construction) is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEngine {
    /// Microsoft Technet security bulletin search (the default).
    Technet,
    /// Google Custom Search JSON API; requires [`Credentials`].
    Google,
}

impl SearchEngine {
    /// Parses a user-supplied engine name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for any value other than
    /// "technet" or "google" (in any casing).
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        if value.eq_ignore_ascii_case("technet") {
            Ok(Self::Technet)
        } else if value.eq_ignore_ascii_case("google") {
            Ok(Self::Google)
        } else {
            Err(ConfigError::invalid_option(format!(
                "invalid search engine: {value}"
            )))
        }
    }
}

/// Google API credentials: both fields must be non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Google API key.
    pub api_key: String,
    /// Google custom search engine ID (the `cx` parameter).
    pub search_engine_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credential values stay out of Debug output; this covers every
        // derived Debug that embeds them (RetrievalConfig, backends).
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("search_engine_id", &"<redacted>")
            .finish()
    }
}

/// Raw option values as supplied by the user, each field unvalidated.
///
/// Built from clap output; every field is optional at this layer so the
/// resolver owns the diagnostics instead of clap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOptions {
    /// `-q/--query` value.
    pub keyword: Option<String>,
    /// `-s/--search-engine` value.
    pub search_engine: Option<String>,
    /// `-r/--regex` value.
    pub link_pattern: Option<String>,
    /// `--apikey` value.
    pub api_key: Option<String>,
    /// `--cx` value.
    pub search_engine_id: Option<String>,
    /// `-d/--dir` value.
    pub dest_dir: Option<String>,
}

impl RawOptions {
    /// True when no option at all was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyword.is_none()
            && self.search_engine.is_none()
            && self.link_pattern.is_none()
            && self.api_key.is_none()
            && self.search_engine_id.is_none()
            && self.dest_dir.is_none()
    }
}

/// The validated, immutable configuration for one retrieval run.
///
/// Once constructed, all fields satisfy the engine-specific requirements;
/// a partially valid value of this type never exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Non-empty search keyword.
    pub keyword: String,
    /// Selected search backend.
    pub engine: SearchEngine,
    /// Optional extraction pattern passed to the link extractor.
    pub link_pattern: Option<String>,
    /// Present iff `engine == SearchEngine::Google`.
    pub credentials: Option<Credentials>,
    /// Destination directory; presence switches the run to download mode.
    pub dest_dir: Option<PathBuf>,
}

impl RetrievalConfig {
    /// Returns true when the run should download files instead of
    /// reporting links.
    #[must_use]
    pub fn download_mode(&self) -> bool {
        self.dest_dir.is_some()
    }
}

/// Resolves raw options into a [`RetrievalConfig`], failing fast on the
/// first invalid or missing value.
///
/// Side effects are limited to a filesystem existence check for the
/// destination directory.
///
/// # Errors
///
/// Returns [`ConfigError::MissingArgument`] when no options were supplied,
/// the keyword is absent or empty, or a required Google credential is
/// missing. Returns [`ConfigError::InvalidOption`] for an unknown engine
/// name, a nonexistent destination directory, or an uncompilable link
/// pattern.
pub fn resolve(options: &RawOptions) -> Result<RetrievalConfig, ConfigError> {
    if options.is_empty() {
        return Err(ConfigError::missing_argument("no options set"));
    }

    // The directory check runs first, at option-intake time, so a bad -d
    // value is reported even when other options are missing.
    let dest_dir = match options.dest_dir.as_deref() {
        Some(dir) => {
            let path = PathBuf::from(dir);
            if !path.is_dir() {
                return Err(ConfigError::invalid_option(format!(
                    "directory not found: {dir}"
                )));
            }
            Some(path)
        }
        None => None,
    };

    let keyword = options
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ConfigError::missing_argument("-q is required"))?
        .to_string();

    let engine = match options.search_engine.as_deref() {
        Some(value) => SearchEngine::parse(value)?,
        None => SearchEngine::Technet,
    };

    let link_pattern = match options.link_pattern.as_deref() {
        Some(pattern) => {
            // Compile once here so a bad pattern fails before any network
            // activity; the extractor compiles from the validated string.
            if Regex::new(pattern).is_err() {
                return Err(ConfigError::invalid_option(format!(
                    "invalid link pattern: {pattern}"
                )));
            }
            Some(pattern.to_string())
        }
        None => None,
    };

    let credentials = match engine {
        SearchEngine::Technet => None,
        SearchEngine::Google => Some(resolve_google_credentials(options)?),
    };

    Ok(RetrievalConfig {
        keyword,
        engine,
        link_pattern,
        credentials,
        dest_dir,
    })
}

fn resolve_google_credentials(options: &RawOptions) -> Result<Credentials, ConfigError> {
    let api_key = options
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ConfigError::missing_argument("no API key set for Google"))?;

    let search_engine_id = options
        .search_engine_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ConfigError::missing_argument("no search engine ID set for Google"))?;

    Ok(Credentials {
        api_key: api_key.to_string(),
        search_engine_id: search_engine_id.to_string(),
    })
}
