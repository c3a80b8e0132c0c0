use async_trait::async_trait;
use veil_core::{Connection, Row};
use veil_sql::ValidatedSql;

/// Runs statements against a target database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a validated statement and return every row it produces.
    ///
    /// Errors carry the driver message verbatim; the pipeline feeds it back
    /// to the model on retry.
    async fn execute(&self, connection: &Connection, sql: &ValidatedSql) -> anyhow::Result<Vec<Row>>;
}
