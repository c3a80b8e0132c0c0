use thiserror::Error;

/// Errors from the policy store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Lock error")]
    LockError,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Connection already registered: {0}")]
    Duplicate(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid redaction document: {0}")]
    InvalidDocument(String),
}

impl StoreError {
    pub(crate) fn connection_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "Connection",
            id: id.to_string(),
        }
    }
}
