//! Attempt state machine for the guarded pipeline.
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │ attempt < max
//!  Draft ─► Candidate ─► Validated ─► Executed ─► Withheld  │
//!                │           │                        │     │
//!                ▼           ▼                        ▼     │
//!            Rejected   ExecutionFailed ───► retry_or_exhaust
//!                │                                │
//!                └────────────────────────────────┘
//!                                                 ▼ attempt == max
//!                                             Exhausted
//! ```
//!
//! States are values; each transition consumes the current state and
//! returns the next one. Calling a transition on a state it does not apply
//! to returns the state unchanged.

use veil_core::Row;
use veil_sql::{SqlGuardError, ValidatedSql, extract_candidate_sql};

/// A failed attempt, fed back to the model as corrective guidance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub sql: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    /// Ready to build a prompt. `previous` is set on retries.
    Draft {
        attempt: u32,
        previous: Option<Failure>,
    },
    /// Completion text cleaned into a statement, not yet checked.
    Candidate { attempt: u32, sql: String },
    /// Passed the SELECT-only guard.
    Validated { attempt: u32, sql: ValidatedSql },
    /// Failed the SELECT-only guard.
    Rejected {
        attempt: u32,
        sql: String,
        reason: SqlGuardError,
    },
    /// The database returned rows.
    Executed {
        attempt: u32,
        sql: ValidatedSql,
        rows: Vec<Row>,
    },
    /// The database rejected the statement.
    ExecutionFailed {
        attempt: u32,
        sql: ValidatedSql,
        error: String,
    },
    /// Rows were discarded: redacted columns could reach them under
    /// another name.
    Withheld {
        attempt: u32,
        sql: ValidatedSql,
        columns: Vec<String>,
    },
    /// No attempts left.
    Exhausted { attempts: u32, last: Failure },
}

impl AttemptState {
    /// First state of a request.
    pub fn start() -> Self {
        Self::Draft {
            attempt: 1,
            previous: None,
        }
    }

    pub fn attempt(&self) -> u32 {
        match self {
            Self::Draft { attempt, .. }
            | Self::Candidate { attempt, .. }
            | Self::Validated { attempt, .. }
            | Self::Rejected { attempt, .. }
            | Self::Executed { attempt, .. }
            | Self::ExecutionFailed { attempt, .. }
            | Self::Withheld { attempt, .. } => *attempt,
            Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Draft { .. } => "draft",
            Self::Candidate { .. } => "candidate",
            Self::Validated { .. } => "validated",
            Self::Rejected { .. } => "rejected",
            Self::Executed { .. } => "executed",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::Withheld { .. } => "withheld",
            Self::Exhausted { .. } => "exhausted",
        }
    }

    /// Draft → Candidate: strip code fences from the completion text.
    pub fn with_completion(self, raw: &str) -> Self {
        match self {
            Self::Draft { attempt, .. } => Self::Candidate {
                attempt,
                sql: extract_candidate_sql(raw),
            },
            other => other,
        }
    }

    /// Candidate → Validated or Rejected.
    pub fn validate(self) -> Self {
        match self {
            Self::Candidate { attempt, sql } => match ValidatedSql::parse(sql.clone()) {
                Ok(sql) => Self::Validated { attempt, sql },
                Err(reason) => Self::Rejected {
                    attempt,
                    sql,
                    reason,
                },
            },
            other => other,
        }
    }

    /// Validated → Executed or ExecutionFailed.
    pub fn with_execution(self, result: anyhow::Result<Vec<Row>>) -> Self {
        match self {
            Self::Validated { attempt, sql } => match result {
                Ok(rows) => Self::Executed { attempt, sql, rows },
                Err(e) => Self::ExecutionFailed {
                    attempt,
                    sql,
                    error: format!("{:#}", e),
                },
            },
            other => other,
        }
    }

    /// Executed → Withheld when `unguarded` names any column, else unchanged.
    pub fn screen(self, unguarded: impl FnOnce(&ValidatedSql, &[Row]) -> Vec<String>) -> Self {
        match self {
            Self::Executed { attempt, sql, rows } => {
                let columns = unguarded(&sql, &rows);
                if columns.is_empty() {
                    Self::Executed { attempt, sql, rows }
                } else {
                    Self::Withheld { attempt, sql, columns }
                }
            }
            other => other,
        }
    }

    /// Rejected, ExecutionFailed or Withheld → Draft with the failure as guidance, or
    /// Exhausted once `max_attempts` have been used.
    pub fn retry_or_exhaust(self, max_attempts: u32) -> Self {
        let (attempt, failure) = match self {
            Self::Rejected {
                attempt,
                sql,
                reason,
            } => (
                attempt,
                Failure {
                    sql,
                    error: reason.to_string(),
                },
            ),
            Self::ExecutionFailed { attempt, sql, error } => (
                attempt,
                Failure {
                    sql: sql.into_inner(),
                    error,
                },
            ),
            Self::Withheld { attempt, sql, columns } => (
                attempt,
                Failure {
                    sql: sql.into_inner(),
                    error: withheld_message(&columns),
                },
            ),
            other => return other,
        };

        if attempt < max_attempts {
            Self::Draft {
                attempt: attempt + 1,
                previous: Some(failure),
            }
        } else {
            Self::Exhausted {
                attempts: attempt,
                last: failure,
            }
        }
    }
}

fn withheld_message(columns: &[String]) -> String {
    format!(
        "redacted column {} is not available here; leave it out or select it by its own name, without an alias or expression",
        columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fenced_completion_becomes_validated() {
        let state = AttemptState::start()
            .with_completion("```sql\nSELECT id FROM orders;\n```")
            .validate();
        match state {
            AttemptState::Validated { attempt, sql } => {
                assert_eq!(attempt, 1);
                assert_eq!(sql.as_str(), "SELECT id FROM orders");
            }
            other => panic!("unexpected state {}", other.name()),
        }
    }

    #[test]
    fn test_rejection_feeds_reason_into_next_draft() {
        let state = AttemptState::start()
            .with_completion("UPDATE users SET x = 1")
            .validate();
        assert_eq!(state.name(), "rejected");

        let next = state.retry_or_exhaust(3);
        assert_eq!(
            next,
            AttemptState::Draft {
                attempt: 2,
                previous: Some(Failure {
                    sql: "UPDATE users SET x = 1".to_string(),
                    error: "not a SELECT".to_string(),
                }),
            }
        );
    }

    #[test]
    fn test_execution_failure_carries_driver_message() {
        let state = AttemptState::start()
            .with_completion("SELECT nope FROM orders")
            .validate()
            .with_execution(Err(anyhow::anyhow!("column \"nope\" does not exist")));
        assert_eq!(state.name(), "execution_failed");

        match state.retry_or_exhaust(3) {
            AttemptState::Draft { attempt, previous } => {
                assert_eq!(attempt, 2);
                assert_eq!(previous.unwrap().error, "column \"nope\" does not exist");
            }
            other => panic!("unexpected state {}", other.name()),
        }
    }

    #[test]
    fn test_third_failure_exhausts() {
        let mut state = AttemptState::start();
        for expected_attempt in 1..=3 {
            assert_eq!(state.attempt(), expected_attempt);
            state = state.with_completion("DELETE FROM orders").validate().retry_or_exhaust(3);
        }
        match state {
            AttemptState::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.sql, "DELETE FROM orders");
                assert_eq!(last.error, "not a SELECT");
            }
            other => panic!("unexpected state {}", other.name()),
        }
    }

    #[test]
    fn test_execution_cannot_skip_validation() {
        // A candidate that never went through validate() ignores execution results
        let candidate = AttemptState::Candidate {
            attempt: 1,
            sql: "SELECT 1".to_string(),
        };
        let after = candidate.clone().with_execution(Ok(Vec::new()));
        assert_eq!(after, candidate);
    }

    #[test]
    fn test_screened_rows_become_guidance() {
        let row = serde_json::json!({ "contact": "jane@example.com" })
            .as_object()
            .cloned()
            .unwrap();
        let state = AttemptState::start()
            .with_completion("SELECT customer_email AS contact FROM orders")
            .validate()
            .with_execution(Ok(vec![row]))
            .screen(|_, _| vec!["orders.customer_email".to_string()]);
        assert_eq!(state.name(), "withheld");

        match state.retry_or_exhaust(3) {
            AttemptState::Draft { attempt, previous } => {
                assert_eq!(attempt, 2);
                let previous = previous.unwrap();
                assert_eq!(previous.sql, "SELECT customer_email AS contact FROM orders");
                assert!(previous.error.starts_with("redacted column orders.customer_email is not available"));
            }
            other => panic!("unexpected state {}", other.name()),
        }
    }

    #[test]
    fn test_clean_screen_keeps_rows() {
        let state = AttemptState::start()
            .with_completion("SELECT id FROM orders")
            .validate()
            .with_execution(Ok(Vec::new()))
            .screen(|_, _| Vec::new());
        assert_eq!(state.name(), "executed");
    }

    #[test]
    fn test_misapplied_transitions_are_no_ops() {
        let draft = AttemptState::start();
        assert_eq!(draft.clone().validate(), draft);
        assert_eq!(draft.clone().retry_or_exhaust(3), draft);
    }
}
