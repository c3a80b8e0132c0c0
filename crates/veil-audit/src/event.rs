//! Audit event types.
//!
//! Every event records who acted, on which connection, what happened, and a
//! free-form JSON `details` object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // ===== Query pipeline =====
    /// A question was answered with redacted rows.
    QueryAnswered,
    /// Every generation attempt failed.
    QueryExhausted,

    // ===== Administration =====
    /// A redaction rule was created, changed or removed.
    RuleChanged,
    /// A connection and its rules were deleted.
    ConnectionRemoved,
}

impl AuditEventType {
    /// Dotted action name recorded with the event.
    pub fn action(&self) -> &'static str {
        match self {
            Self::QueryAnswered => "query.answered",
            Self::QueryExhausted => "query.exhausted",
            Self::RuleChanged => "rule.changed",
            Self::ConnectionRemoved => "connection.removed",
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueryAnswered => write!(f, "QUERY_ANSWERED"),
            Self::QueryExhausted => write!(f, "QUERY_EXHAUSTED"),
            Self::RuleChanged => write!(f, "RULE_CHANGED"),
            Self::ConnectionRemoved => write!(f, "CONNECTION_REMOVED"),
        }
    }
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    /// Event type.
    pub event_type: AuditEventType,

    /// Action name, e.g. `query.answered`.
    pub action: String,

    /// Acting user.
    pub actor: String,

    /// Roles the actor was acting under.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Target connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,

    /// Event-specific details.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl AuditEvent {
    /// Create a new audit event; the action defaults to the type's action name.
    pub fn new(event_type: AuditEventType, actor: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event_type,
            action: event_type.action().to_string(),
            actor: actor.into(),
            roles: Vec::new(),
            connection_id: None,
            details: serde_json::Value::Null,
        }
    }

    /// Create a builder for an audit event.
    pub fn builder(event_type: AuditEventType, actor: impl Into<String>) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type, actor)
    }

    /// Format the event as a human-readable log line.
    ///
    /// Format: `[timestamp] EVENT_TYPE actor=... action=... [connection=...] [sql=...]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} actor={} action={}",
            self.occurred_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.event_type,
            self.actor,
            self.action,
        );

        if !self.roles.is_empty() {
            line.push_str(&format!(" roles={}", self.roles.join(",")));
        }

        if let Some(ref connection_id) = self.connection_id {
            line.push_str(&format!(" connection={}", connection_id));
        }

        let sql = self
            .details
            .get("sql")
            .or_else(|| self.details.get("lastSql"))
            .and_then(|v| v.as_str());
        if let Some(sql) = sql {
            // Truncate long SQL for console output
            let sql_preview = match sql.char_indices().nth(100) {
                Some((idx, _)) => format!("{}...", &sql[..idx]),
                None => sql.to_string(),
            };
            line.push_str(&format!(" sql=\"{}\"", sql_preview.replace('\n', " ")));
        }

        if let Some(rows) = self.details.get("rowCount").and_then(|v| v.as_u64()) {
            line.push_str(&format!(" rows={}", rows));
        }

        if let Some(true) = self.details.get("redactionsApplied").and_then(|v| v.as_bool()) {
            line.push_str(" redacted=true");
        }

        if let Some(error) = self.details.get("lastError").and_then(|v| v.as_str()) {
            line.push_str(&format!(" error=\"{}\"", error.replace('"', "'")));
        }

        line
    }
}

/// Builder for creating audit events.
#[derive(Debug)]
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    /// Create a new builder with required fields.
    pub fn new(event_type: AuditEventType, actor: impl Into<String>) -> Self {
        Self {
            event: AuditEvent::new(event_type, actor),
        }
    }

    /// Override the action name.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.event.action = action.into();
        self
    }

    /// Set the roles the actor acted under.
    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.event.roles = roles;
        self
    }

    /// Set the connection ID.
    pub fn connection_id(mut self, id: impl Into<String>) -> Self {
        self.event.connection_id = Some(id.into());
        self
    }

    /// Set the details object.
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.event.details = details;
        self
    }

    /// Build the audit event.
    pub fn build(self) -> AuditEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_sets_fields() {
        let event = AuditEvent::builder(AuditEventType::QueryAnswered, "alice")
            .roles(vec!["analyst".into()])
            .connection_id("shop")
            .details(json!({ "sql": "SELECT 1", "rowCount": 1 }))
            .build();

        assert_eq!(event.action, "query.answered");
        assert_eq!(event.actor, "alice");
        assert_eq!(event.connection_id.as_deref(), Some("shop"));
        assert_eq!(event.details["rowCount"], 1);
    }

    #[test]
    fn test_log_line_format() {
        let event = AuditEvent::builder(AuditEventType::QueryExhausted, "bob")
            .connection_id("shop")
            .details(json!({ "lastSql": "DELETE\nFROM x", "lastError": "not a \"SELECT\"" }))
            .build();

        let line = event.to_log_line();
        assert!(line.contains("QUERY_EXHAUSTED actor=bob action=query.exhausted"));
        assert!(line.contains("connection=shop"));
        assert!(line.contains("sql=\"DELETE FROM x\""));
        assert!(line.contains("error=\"not a 'SELECT'\""));
    }

    #[test]
    fn test_long_sql_truncated() {
        let sql = format!("SELECT {} FROM t", "é".repeat(200));
        let event = AuditEvent::builder(AuditEventType::QueryAnswered, "alice")
            .details(json!({ "sql": sql }))
            .build();
        assert!(event.to_log_line().ends_with("...\""));
    }

    #[test]
    fn test_serialization_round_trip() {
        let event = AuditEvent::builder(AuditEventType::RuleChanged, "admin")
            .details(json!({ "table": "users", "column": "ssn", "rule": "REDACT" }))
            .build();
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"rule_changed\""));
        assert!(!json.contains("connection_id"));

        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
