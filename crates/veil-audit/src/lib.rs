//! # veil-audit
//!
//! Audit logging for Veil.
//!
//! This crate provides functionality for:
//! - Recording answered and exhausted natural-language queries, with the
//!   redaction impact of each answer
//! - Recording administrative changes (rules, connections)
//! - Storing audit events in files (JSON Lines) and console (human-readable)
//! - Querying audit history with filters
//!
//! ## Event Types
//!
//! | Event Type | Action | Description |
//! |------------|--------|-------------|
//! | `QueryAnswered` | `query.answered` | Question answered with redacted rows |
//! | `QueryExhausted` | `query.exhausted` | No attempt produced a usable statement |
//! | `RuleChanged` | `rule.changed` | Redaction rule created, changed or removed |
//! | `ConnectionRemoved` | `connection.removed` | Connection and its rules deleted |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use veil_audit::AuditLogger;
//! use veil_core::{AuditConfig, QueryAuditDetails, RedactionImpact};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = AuditLogger::new(AuditConfig::default())?;
//!
//! let details = QueryAuditDetails::new(
//!     "show all orders",
//!     "SELECT id, total FROM orders",
//!     RedactionImpact::default(),
//!     12,
//! );
//! logger.log_query_answered("alice", &[], "shop", &details).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod logger;
pub mod storage;

pub use error::AuditError;
pub use event::{AuditEvent, AuditEventBuilder, AuditEventType};
pub use logger::{AuditFilter, AuditLogger, QUESTION_NOT_RECORDED};
pub use storage::{AuditStorage, ConsoleStorage, DualStorage, FileStorage, MemoryStorage, NullStorage};
