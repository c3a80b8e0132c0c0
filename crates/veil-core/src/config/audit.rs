//! Audit logging configuration.

use serde::{Deserialize, Serialize};

/// Configuration for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Also print events to stdout.
    #[serde(default)]
    pub stdout: bool,

    /// Directory for the `audit.log` JSON Lines file.
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Whether to record the user's question text.
    #[serde(default = "default_enabled")]
    pub log_questions: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            stdout: false,
            directory: default_directory(),
            log_questions: default_enabled(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_directory() -> String {
    "logs".to_string()
}
