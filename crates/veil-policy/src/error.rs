//! Error types for policy resolution.

use thiserror::Error;

/// Why a role or user redaction document could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DocumentError(pub String);

impl DocumentError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors that can occur while resolving the effective redaction policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A stored role or user document does not have a recognised shape.
    #[error("malformed {scope} redaction document for '{owner}': {reason}")]
    MalformedDocument {
        scope: &'static str,
        owner: String,
        reason: String,
    },

    /// The rule store could not be read.
    #[error("failed to load redaction rules: {0:#}")]
    Source(#[from] anyhow::Error),
}
