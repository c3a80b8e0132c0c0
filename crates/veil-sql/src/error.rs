//! Error types for the SQL guard.

use thiserror::Error;

/// Reasons a statement is rejected by the SELECT-only guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlGuardError {
    /// Statement does not start with `SELECT`.
    #[error("not a SELECT")]
    NotSelect,

    /// Statement contains a `;` separator.
    #[error("multiple statements")]
    MultipleStatements,

    /// Statement contains a write or DDL keyword.
    #[error("write/DDL statement ({keyword})")]
    WriteOrDdl { keyword: String },
}

impl SqlGuardError {
    /// Short, stable rejection reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotSelect => "not a SELECT",
            Self::MultipleStatements => "multiple statements",
            Self::WriteOrDdl { .. } => "write/DDL statement",
        }
    }
}
