//! Error types for the query pipeline.

use crate::response::ExhaustedResponse;
use thiserror::Error;
use veil_policy::PolicyError;
use veil_schema::SchemaError;

/// Errors that end a pipeline request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("failed to look up connection: {0:#}")]
    ConnectionLookup(anyhow::Error),

    #[error(transparent)]
    IntrospectionFailed(#[from] SchemaError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("completion request failed: {0:#}")]
    Completion(anyhow::Error),

    /// Every attempt was rejected or failed to execute.
    #[error("could not generate a valid query after {attempts} attempts: {last_error}")]
    GenerationExhausted {
        attempts: u32,
        last_sql: String,
        last_error: String,
        available_tables: Vec<String>,
    },
}

impl PipelineError {
    /// Caller-facing diagnostics for an exhausted request.
    pub fn exhausted_response(&self) -> Option<ExhaustedResponse> {
        match self {
            Self::GenerationExhausted {
                attempts,
                last_sql,
                last_error,
                available_tables,
            } => Some(ExhaustedResponse {
                error: format!("Could not generate a valid query after {} attempts", attempts),
                last_error: last_error.clone(),
                last_sql: last_sql.clone(),
                available_tables: available_tables.clone(),
            }),
            _ => None,
        }
    }
}
