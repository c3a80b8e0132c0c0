//! Text completion service configuration.
//!
//! The API key can be supplied two ways (in order of precedence):
//! 1. `api_key_env` - reference an environment variable
//! 2. `api_key` - provide the key directly

use serde::{Deserialize, Serialize};

/// Configuration for an OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable containing the API key. Highest precedence.
    #[serde(default = "default_api_key_env", skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub temperature: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
            temperature: 0.0,
        }
    }
}

impl CompletionConfig {
    /// Get the API key, checking `api_key_env` first.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(env_var) = &self.api_key_env
            && let Ok(key) = std::env::var(env_var)
        {
            return Some(key);
        }
        self.api_key.clone()
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("VEIL_COMPLETION_API_KEY".to_string())
}

fn default_timeout_seconds() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_key_used_when_env_unset() {
        let config = CompletionConfig {
            api_key_env: Some("VEIL_TEST_UNSET_COMPLETION_KEY".to_string()),
            api_key: Some("sk-direct".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-direct"));
    }

    #[test]
    fn test_no_key() {
        let config = CompletionConfig {
            api_key_env: None,
            api_key: None,
            ..Default::default()
        };
        assert!(config.resolve_api_key().is_none());
    }
}
