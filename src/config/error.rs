//! Error types for configuration resolution.
//!
//! Every failure here is surfaced before any collaborator is invoked; a run
//! never starts with a partially valid configuration.

use thiserror::Error;

/// Errors that can occur while resolving raw options into a [`RetrievalConfig`].
///
/// [`RetrievalConfig`]: super::RetrievalConfig
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required option (or required credential for Google) is absent.
    #[error("missing argument: {reason}")]
    MissingArgument {
        /// What is missing and how to supply it.
        reason: String,
    },

    /// A supplied option value is syntactically or semantically invalid.
    #[error("invalid option: {reason}")]
    InvalidOption {
        /// What was invalid, including the offending value.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a `MissingArgument` error.
    #[must_use]
    pub fn missing_argument(reason: impl Into<String>) -> Self {
        Self::MissingArgument {
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidOption` error.
    #[must_use]
    pub fn invalid_option(reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            reason: reason.into(),
        }
    }
}
