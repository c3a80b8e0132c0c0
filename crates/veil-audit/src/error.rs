use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// The directory holding the audit log could not be created.
    #[error("cannot create audit log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A storage lock was poisoned by a panicking writer.
    #[error("audit storage lock poisoned")]
    LockPoisoned,

    #[error("cannot encode audit event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("audit log I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
