//! Guarded natural-language query pipeline.

use crate::adapter::QueryExecutor;
use crate::completion::CompletionClient;
use crate::error::PipelineError;
use crate::prompt;
use crate::response::QueryAnswer;
use crate::state::AttemptState;
use std::sync::Arc;
use veil_audit::AuditLogger;
use veil_core::{Connection, ConnectionSource, PipelineConfig, QueryAuditDetails, Row};
use veil_policy::{PolicyResolver, Redactor, ResolvedPolicy, RuleSource, assess_impact, unguarded_columns};
use veil_schema::SchemaCache;
use veil_sql::ValidatedSql;

/// Turns a question into redacted rows.
///
/// Attempts run strictly one after another. A statement reaches the
/// executor only as a [`ValidatedSql`].
pub struct GuardedPipeline {
    connections: Arc<dyn ConnectionSource>,
    schema_cache: Arc<SchemaCache>,
    resolver: PolicyResolver,
    executor: Arc<dyn QueryExecutor>,
    completion: Arc<dyn CompletionClient>,
    redactor: Redactor,
    audit: Arc<AuditLogger>,
    config: PipelineConfig,
}

impl GuardedPipeline {
    pub fn new(
        connections: Arc<dyn ConnectionSource>,
        schema_cache: Arc<SchemaCache>,
        rules: Arc<dyn RuleSource>,
        executor: Arc<dyn QueryExecutor>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            connections,
            schema_cache,
            resolver: PolicyResolver::new(rules),
            executor,
            completion,
            redactor: Redactor::from_config(&Default::default()),
            audit: Arc::new(AuditLogger::disabled()),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve the policy a request would run under, without generating anything.
    pub async fn resolve_policy(
        &self,
        connection_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> Result<(Connection, ResolvedPolicy), PipelineError> {
        let connection = self
            .connections
            .get_connection(connection_id)
            .await
            .map_err(PipelineError::ConnectionLookup)?
            .ok_or_else(|| PipelineError::ConnectionNotFound(connection_id.to_string()))?;

        let schema = self.schema_cache.get_schema(&connection).await?;
        let policy = self
            .resolver
            .resolve(&connection.id, user_id, role_ids, &schema)
            .await?;

        Ok((connection, policy))
    }

    /// Answer `question` on a connection for `user_id` acting under `role_ids`.
    pub async fn answer(
        &self,
        connection_id: &str,
        question: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> Result<QueryAnswer, PipelineError> {
        let (connection, policy) = self.resolve_policy(connection_id, user_id, role_ids).await?;

        let system_prompt = prompt::generation_system_prompt(
            connection.driver,
            &policy.filtered_schema,
            &connection.table_notes,
        );

        let mut state = AttemptState::start();
        let (sql, rows) = loop {
            state = match state {
                AttemptState::Draft { attempt, ref previous } => {
                    let user_prompt = prompt::generation_user_prompt(question, previous.as_ref());
                    tracing::debug!(connection_id, attempt, "Requesting SQL completion");
                    let raw = self
                        .completion
                        .complete(&system_prompt, &user_prompt)
                        .await
                        .map_err(PipelineError::Completion)?;
                    state.with_completion(&raw)
                }
                AttemptState::Candidate { .. } => state.validate(),
                AttemptState::Validated { ref sql, attempt } => {
                    tracing::debug!(connection_id, attempt, sql = %sql, "Executing validated statement");
                    let result = self.executor.execute(&connection, sql).await;
                    state
                        .with_execution(result)
                        .screen(|sql, rows| unguarded_columns(sql.as_str(), &policy, rows))
                }
                AttemptState::Rejected { attempt, ref reason, .. } => {
                    tracing::info!(connection_id, attempt, reason = reason.reason(), "Generated statement rejected");
                    state.retry_or_exhaust(self.config.max_attempts)
                }
                AttemptState::ExecutionFailed { attempt, ref error, .. } => {
                    tracing::info!(connection_id, attempt, error = %error, "Generated statement failed");
                    state.retry_or_exhaust(self.config.max_attempts)
                }
                AttemptState::Withheld { attempt, ref columns, .. } => {
                    tracing::warn!(connection_id, attempt, columns = ?columns, "Result withheld, redacted column under another name");
                    state.retry_or_exhaust(self.config.max_attempts)
                }
                AttemptState::Executed { sql, rows, attempt } => {
                    tracing::debug!(connection_id, attempt, row_count = rows.len(), "Statement executed");
                    break (sql, rows);
                }
                AttemptState::Exhausted { attempts, last } => {
                    return Err(self
                        .exhausted(&connection, question, user_id, role_ids, &policy, attempts, last)
                        .await);
                }
            };
        };

        Ok(self
            .finish(&connection, question, user_id, role_ids, &policy, sql, rows)
            .await)
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        connection: &Connection,
        question: &str,
        user_id: &str,
        role_ids: &[String],
        policy: &ResolvedPolicy,
        sql: ValidatedSql,
        mut rows: Vec<Row>,
    ) -> QueryAnswer {
        let row_count = rows.len();
        rows.truncate(self.config.row_cap);

        let rows = self.redactor.redact(rows, policy, sql.as_str());
        let impact = assess_impact(sql.as_str(), policy);
        let summary = self.summarize(question, sql.as_str(), row_count, &rows).await;

        let details = QueryAuditDetails::new(question, sql.as_str(), impact.clone(), row_count);
        if let Err(e) = self
            .audit
            .log_query_answered(user_id, role_ids, &connection.id, &details)
            .await
        {
            tracing::warn!(connection_id = %connection.id, error = %e, "Failed to record audit event");
        }

        tracing::info!(
            connection_id = %connection.id,
            row_count,
            returned = rows.len(),
            redactions = impact.total_applied(),
            "Question answered"
        );

        QueryAnswer {
            sql: sql.into_inner(),
            summary,
            row_count,
            rows,
            impact,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn exhausted(
        &self,
        connection: &Connection,
        question: &str,
        user_id: &str,
        role_ids: &[String],
        policy: &ResolvedPolicy,
        attempts: u32,
        last: crate::state::Failure,
    ) -> PipelineError {
        tracing::warn!(connection_id = %connection.id, attempts, last_error = %last.error, "Generation exhausted");

        if let Err(e) = self
            .audit
            .log_query_exhausted(user_id, role_ids, &connection.id, question, &last.sql, &last.error, attempts)
            .await
        {
            tracing::warn!(connection_id = %connection.id, error = %e, "Failed to record audit event");
        }

        PipelineError::GenerationExhausted {
            attempts,
            last_sql: last.sql,
            last_error: last.error,
            available_tables: policy.available_tables(),
        }
    }

    /// Ask for a short summary of already-redacted rows. Never fails.
    async fn summarize(&self, question: &str, sql: &str, row_count: usize, rows: &[Row]) -> String {
        if !self.config.summarize {
            return prompt::generic_summary(row_count);
        }

        let sample = &rows[..rows.len().min(self.config.summary_sample_rows)];
        let user_prompt = prompt::summary_user_prompt(question, sql, row_count, sample);
        match self
            .completion
            .complete(prompt::SUMMARY_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => prompt::generic_summary(row_count),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "Summary failed, using generic summary");
                prompt::generic_summary(row_count)
            }
        }
    }
}
