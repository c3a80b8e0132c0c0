//! Configuration loading and component wiring shared by the commands.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use veil_adapter::SqlxDriver;
use veil_audit::AuditLogger;
use veil_core::VeilConfig;
use veil_policy::Redactor;
use veil_runtime::GuardedPipeline;
use veil_schema::SchemaCache;
use veil_store::PolicyStore;

use crate::completion::HttpCompletionClient;

/// Load configuration from YAML or TOML (chosen by extension).
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<VeilConfig> {
    if !path.exists() {
        info!(config = %path.display(), "No configuration file, using defaults");
        return Ok(VeilConfig::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: VeilConfig = if path.extension().map(|e| e == "toml").unwrap_or(false) {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    config.validate()?;

    info!(config = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Everything a command may need, built from one configuration.
pub struct AppContext {
    pub config: VeilConfig,
    pub store: Arc<PolicyStore>,
    pub driver: Arc<SqlxDriver>,
    pub audit: Arc<AuditLogger>,
}

impl AppContext {
    pub fn new(config: VeilConfig) -> Result<Self> {
        let store = PolicyStore::open(&config.store.path)
            .with_context(|| format!("Failed to open store: {}", config.store.path.display()))?;
        let audit = AuditLogger::new(config.audit.clone()).context("Failed to initialize audit logging")?;

        Ok(Self {
            config,
            store: Arc::new(store),
            driver: Arc::new(SqlxDriver::new()),
            audit: Arc::new(audit),
        })
    }

    /// Build the query pipeline over the store, the sqlx driver and the HTTP model.
    pub fn pipeline(&self) -> Result<GuardedPipeline> {
        let completion = HttpCompletionClient::new(&self.config.completion)?;
        let cache = SchemaCache::new(self.driver.clone()).with_ttl(self.config.schema_cache.ttl());

        Ok(GuardedPipeline::new(
            self.store.clone(),
            Arc::new(cache),
            self.store.clone(),
            self.driver.clone(),
            Arc::new(completion),
        )
        .with_redactor(Redactor::from_config(&self.config.redaction))
        .with_audit(self.audit.clone())
        .with_config(self.config.pipeline.clone()))
    }
}
