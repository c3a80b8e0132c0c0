//! Configuration types for Veil.
//!
//! Configuration is loaded from a single YAML file (`veil.yaml`) into a
//! `VeilConfig`. Every section is optional and falls back to defaults.

pub mod audit;
pub mod completion;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use audit::AuditConfig;
pub use completion::CompletionConfig;

/// Complete Veil configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VeilConfig {
    /// Guarded query pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Schema snapshot cache settings.
    #[serde(default)]
    pub schema_cache: SchemaCacheConfig,

    /// Redaction output settings.
    #[serde(default)]
    pub redaction: RedactionConfig,

    /// Text completion service.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Connection and rule store.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Guarded query pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Generation attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Rows returned to the caller.
    #[serde(default = "default_row_cap")]
    pub row_cap: usize,

    /// Rows shown to the language model when summarising.
    #[serde(default = "default_summary_sample_rows")]
    pub summary_sample_rows: usize,

    /// Whether to ask for a natural-language summary.
    #[serde(default = "default_true")]
    pub summarize: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            row_cap: default_row_cap(),
            summary_sample_rows: default_summary_sample_rows(),
            summarize: true,
        }
    }
}

/// Schema snapshot cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCacheConfig {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for SchemaCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl SchemaCacheConfig {
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_seconds)
    }
}

/// Redaction output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Replacement for redacted values.
    #[serde(default = "default_mask_token")]
    pub mask_token: String,

    /// Character used inside masked emails.
    #[serde(default = "default_mask_char")]
    pub mask_char: char,

    /// Length of the random part of HASH tokens.
    #[serde(default = "default_hash_token_length")]
    pub hash_token_length: usize,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            mask_token: default_mask_token(),
            mask_char: default_mask_char(),
            hash_token_length: default_hash_token_length(),
        }
    }
}

/// Connection and rule store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// YAML file holding connections and redaction rules.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_row_cap() -> usize {
    100
}

fn default_summary_sample_rows() -> usize {
    5
}

fn default_ttl_seconds() -> u64 {
    300
}

fn default_mask_token() -> String {
    "[REDACTED]".to_string()
}

fn default_mask_char() -> char {
    '*'
}

fn default_hash_token_length() -> usize {
    16
}

fn default_store_path() -> PathBuf {
    PathBuf::from("veil-store.yaml")
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VeilConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.max_attempts == 0 {
            return Err(ConfigError::Config(
                "pipeline.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.pipeline.row_cap == 0 {
            return Err(ConfigError::Config(
                "pipeline.row_cap must be at least 1".to_string(),
            ));
        }
        if self.redaction.mask_token.is_empty() {
            return Err(ConfigError::Config(
                "redaction.mask_token must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VeilConfig::default();
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.pipeline.row_cap, 100);
        assert_eq!(config.schema_cache.ttl(), std::time::Duration::from_secs(300));
        assert_eq!(config.redaction.mask_token, "[REDACTED]");
        assert_eq!(config.redaction.mask_char, '*');
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
pipeline:
  row_cap: 25
redaction:
  mask_token: "***"
store:
  path: /var/lib/veil/store.yaml
"#;
        let config = VeilConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.pipeline.row_cap, 25);
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.redaction.mask_token, "***");
        assert_eq!(config.store.path, PathBuf::from("/var/lib/veil/store.yaml"));
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let yaml = "pipeline:\n  max_attempts: 0\n";
        assert!(matches!(
            VeilConfig::from_yaml(yaml),
            Err(ConfigError::Config(_))
        ));
    }
}
