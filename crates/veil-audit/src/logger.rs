//! Audit logger implementation.
//!
//! Provides the main `AuditLogger` type with helper methods for logging
//! answered and exhausted queries and administrative changes.

use std::path::PathBuf;
use std::sync::Arc;
use veil_core::{AuditConfig, QueryAuditDetails};

use crate::error::AuditError;
use crate::event::{AuditEvent, AuditEventType};
use crate::storage::{AuditStorage, DualStorage, FileStorage, NullStorage};

/// Stand-in for question text when questions are not recorded.
pub const QUESTION_NOT_RECORDED: &str = "[not recorded]";

/// Records pipeline outcomes and administrative changes.
pub struct AuditLogger {
    config: AuditConfig,
    storage: Arc<dyn AuditStorage>,
}

impl AuditLogger {
    /// Build a logger writing JSON Lines to `<directory>/audit.log`, mirrored
    /// to stdout when `stdout` is set.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        let storage: Arc<dyn AuditStorage> = match (config.enabled, config.stdout) {
            (false, _) => Arc::new(NullStorage::new()),
            (true, true) => Arc::new(DualStorage::new(Self::log_path(&config))?),
            (true, false) => Arc::new(FileStorage::new(Self::log_path(&config))?),
        };
        Ok(Self { config, storage })
    }

    pub fn with_storage(config: AuditConfig, storage: Arc<dyn AuditStorage>) -> Self {
        Self { config, storage }
    }

    /// A logger that drops every event.
    pub fn disabled() -> Self {
        Self::with_storage(
            AuditConfig {
                enabled: false,
                ..Default::default()
            },
            Arc::new(NullStorage::new()),
        )
    }

    pub fn log_path(config: &AuditConfig) -> PathBuf {
        PathBuf::from(&config.directory).join("audit.log")
    }

    /// Log an audit event.
    pub async fn log(&self, event: AuditEvent) -> Result<(), AuditError> {
        if !self.config.enabled {
            return Ok(());
        }

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            actor = %event.actor,
            action = %event.action,
            connection_id = event.connection_id.as_deref().unwrap_or("-"),
            "Audit event"
        );

        self.storage.store(event).await
    }

    /// Log an answered question with its redaction impact.
    pub async fn log_query_answered(
        &self,
        actor: &str,
        roles: &[String],
        connection_id: &str,
        details: &QueryAuditDetails,
    ) -> Result<(), AuditError> {
        let mut details = details.clone();
        if !self.config.log_questions {
            details.question = QUESTION_NOT_RECORDED.to_string();
        }

        let event = AuditEvent::builder(AuditEventType::QueryAnswered, actor)
            .roles(roles.to_vec())
            .connection_id(connection_id)
            .details(serde_json::to_value(&details)?)
            .build();

        self.log(event).await
    }

    /// Log a question for which no attempt produced a usable statement.
    #[allow(clippy::too_many_arguments)]
    pub async fn log_query_exhausted(
        &self,
        actor: &str,
        roles: &[String],
        connection_id: &str,
        question: &str,
        last_sql: &str,
        last_error: &str,
        attempts: u32,
    ) -> Result<(), AuditError> {
        let question = if self.config.log_questions {
            question
        } else {
            QUESTION_NOT_RECORDED
        };

        let event = AuditEvent::builder(AuditEventType::QueryExhausted, actor)
            .roles(roles.to_vec())
            .connection_id(connection_id)
            .details(serde_json::json!({
                "question": question,
                "lastSql": last_sql,
                "lastError": last_error,
                "attempts": attempts,
            }))
            .build();

        self.log(event).await
    }

    /// Log a change to a redaction rule.
    pub async fn log_rule_changed(
        &self,
        actor: &str,
        connection_id: Option<&str>,
        details: serde_json::Value,
    ) -> Result<(), AuditError> {
        let mut builder = AuditEvent::builder(AuditEventType::RuleChanged, actor).details(details);

        if let Some(connection_id) = connection_id {
            builder = builder.connection_id(connection_id);
        }

        self.log(builder.build()).await
    }

    /// Log the removal of a connection.
    pub async fn log_connection_removed(&self, actor: &str, connection_id: &str) -> Result<(), AuditError> {
        let event = AuditEvent::builder(AuditEventType::ConnectionRemoved, actor)
            .connection_id(connection_id)
            .build();

        self.log(event).await
    }

    /// Query audit events with filters.
    pub async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.storage.query(filter).await
    }
}

/// Filter for querying audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by acting user.
    pub actor: Option<String>,
    /// Filter by connection.
    pub connection_id: Option<String>,
    /// Filter by event type.
    pub event_type: Option<AuditEventType>,
    /// Filter by start time.
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Keep only the most recent `limit` matches.
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Filter `events` (oldest first), keeping the newest `limit`.
    pub fn apply(&self, events: Vec<AuditEvent>) -> Vec<AuditEvent> {
        let mut results: Vec<AuditEvent> = events
            .into_iter()
            .filter(|e| self.actor.as_ref().is_none_or(|a| &e.actor == a))
            .filter(|e| {
                self.connection_id
                    .as_ref()
                    .is_none_or(|c| e.connection_id.as_ref() == Some(c))
            })
            .filter(|e| self.event_type.is_none_or(|t| e.event_type == t))
            .filter(|e| self.start_time.is_none_or(|t| e.occurred_at >= t))
            .collect();

        if let Some(limit) = self.limit
            && results.len() > limit
        {
            results.drain(..results.len() - limit);
        }
        results
    }
}
