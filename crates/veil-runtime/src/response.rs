//! Caller-facing response shapes.

use serde::{Deserialize, Serialize};
use veil_core::{RedactionImpact, Row};

/// A successfully answered question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnswer {
    pub sql: String,
    pub summary: String,
    /// Rows the database returned, before the response cap.
    pub row_count: usize,
    /// Redacted rows, capped.
    pub rows: Vec<Row>,
    /// Recorded in the audit trail, not returned to callers.
    #[serde(skip)]
    pub impact: RedactionImpact,
}

/// Diagnostics returned when generation is exhausted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExhaustedResponse {
    pub error: String,
    pub last_error: String,
    #[serde(rename = "lastSQL")]
    pub last_sql: String,
    pub available_tables: Vec<String>,
}
