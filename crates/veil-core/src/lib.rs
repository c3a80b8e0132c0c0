use serde::{Deserialize, Serialize};

// Configuration types shared across all Veil crates
pub mod config;

pub mod connection;
pub mod impact;
pub mod rules;

// Re-export commonly used types for convenience
pub use config::{
    AuditConfig, CompletionConfig, ConfigError, PipelineConfig, RedactionConfig,
    SchemaCacheConfig, StoreConfig, VeilConfig,
};
pub use connection::{Connection, ConnectionSource, ConnectionStatus, DriverKind};
pub use impact::RedactionImpact;
pub use rules::{ColumnRule, PatternRule, RoleRedactionSet, RuleKind, UserRedactionSet};

/// One result row, column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Audit details attached to an answered natural-language query.
///
/// Field names match `schemas/QueryAuditDetails.schema.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryAuditDetails {
    pub question: String,
    pub sql: String,
    /// True when at least one redaction rule affected this query.
    pub redactions_applied: bool,
    pub redaction_impact: RedactionImpact,
    /// Rows returned by the database before the response cap.
    pub row_count: usize,
}

impl QueryAuditDetails {
    pub fn new(
        question: impl Into<String>,
        sql: impl Into<String>,
        redaction_impact: RedactionImpact,
        row_count: usize,
    ) -> Self {
        Self {
            question: question.into(),
            sql: sql.into(),
            redactions_applied: !redaction_impact.is_empty(),
            redaction_impact,
            row_count,
        }
    }
}
