//! Error types for search backend operations.
//!
//! A search-phase failure is fatal to the run: no partial link set is ever
//! reported. These errors carry enough context for a single actionable
//! diagnostic line.

use thiserror::Error;

/// Errors that can occur while querying a search backend.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// Transport-level failure (DNS, connection refused, TLS, timeout).
    #[error("search request failed for '{url}': {reason}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport failure, rendered.
        reason: String,
    },

    /// The backend returned a non-success HTTP status.
    #[error("search backend returned HTTP {status} for '{url}'")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The backend rejected the supplied credentials server-side.
    #[error("search backend rejected credentials (HTTP {status}): {reason}")]
    Auth {
        /// The HTTP status code (typically 400, 401, or 403).
        status: u16,
        /// What the backend said, when available.
        reason: String,
    },

    /// The backend responded with a body this client cannot interpret.
    #[error("unexpected response from {backend}: {reason}")]
    UnexpectedResponse {
        /// Name of the backend ("technet" or "google").
        backend: &'static str,
        /// Why the response could not be interpreted.
        reason: String,
    },

    /// HTTP client construction failed for a backend.
    #[error("failed to build HTTP client for {backend}: {reason}")]
    ClientBuild {
        /// Name of the backend.
        backend: &'static str,
        /// The builder failure, rendered.
        reason: String,
    },
}

impl SearchError {
    /// Creates a `Network` error from a reqwest error.
    pub fn network(url: impl Into<String>, source: &reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            reason: source.to_string(),
        }
    }

    /// Creates an `HttpStatus` error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an `Auth` error.
    pub fn auth(status: u16, reason: impl Into<String>) -> Self {
        Self::Auth {
            status,
            reason: reason.into(),
        }
    }

    /// Creates an `UnexpectedResponse` error.
    pub fn unexpected(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            backend,
            reason: reason.into(),
        }
    }

    /// Creates a `ClientBuild` error.
    pub fn client_build(backend: &'static str, source: &reqwest::Error) -> Self {
        Self::ClientBuild {
            backend,
            reason: source.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display() {
        let err = SearchError::http_status("https://example.com/search", 503);
        let msg = err.to_string();
        assert!(msg.contains("503"), "got: {msg}");
        assert!(msg.contains("https://example.com/search"), "got: {msg}");
    }

    #[test]
    fn test_auth_display() {
        let err = SearchError::auth(403, "API key invalid");
        let msg = err.to_string();
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("API key invalid"), "got: {msg}");
    }

    #[test]
    fn test_unexpected_display() {
        let err = SearchError::unexpected("google", "missing items array");
        let msg = err.to_string();
        assert!(msg.contains("google"), "got: {msg}");
        assert!(msg.contains("missing items array"), "got: {msg}");
    }
}
