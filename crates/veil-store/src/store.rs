//! YAML-backed policy store.
//!
//! All records live in memory behind a lock. When the store has a path,
//! the whole file is rewritten after every mutation.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use veil_core::{
    ColumnRule, Connection, ConnectionSource, ConnectionStatus, PatternRule, RoleRedactionSet,
    RuleKind, UserRedactionSet,
};
use veil_policy::{RoleDocument, RuleSource, decode_user_document};

/// Everything the store persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreData {
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub column_rules: Vec<ColumnRule>,
    #[serde(default)]
    pub role_sets: Vec<RoleRedactionSet>,
    #[serde(default)]
    pub user_sets: Vec<UserRedactionSet>,
    #[serde(default)]
    pub pattern_rules: Vec<PatternRule>,
}

/// Connections and the four redaction rule sources.
pub struct PolicyStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl PolicyStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(StoreData::default()),
        }
    }

    /// Open the store at `path`, loading it if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                StoreData::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        } else {
            StoreData::default()
        };

        tracing::info!(
            path = %path.display(),
            connections = data.connections.len(),
            column_rules = data.column_rules.len(),
            role_sets = data.role_sets.len(),
            user_sets = data.user_sets.len(),
            pattern_rules = data.pattern_rules.len(),
            "Loaded policy store"
        );

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreData>, StoreError> {
        self.data.read().map_err(|_| StoreError::LockError)
    }

    /// Apply `f` to a copy under the write lock, persist the copy, then
    /// swap it in.
    ///
    /// When `f` or the file write fails, memory and disk are unchanged.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.write().map_err(|_| StoreError::LockError)?;
        let mut next = data.clone();
        let out = f(&mut next)?;
        if let Some(path) = &self.path {
            Self::rewrite_file(path, &next)?;
        }
        *data = next;
        Ok(out)
    }

    fn rewrite_file(path: &Path, data: &StoreData) -> Result<(), StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(data)?)?;
        Ok(())
    }

    /// Copy of everything in the store.
    pub fn snapshot(&self) -> Result<StoreData, StoreError> {
        Ok(self.read()?.clone())
    }

    // ---------------------------------------------------------------------
    // Connections
    // ---------------------------------------------------------------------

    pub fn register_connection(&self, connection: Connection) -> Result<(), StoreError> {
        self.mutate(|data| {
            if data.connections.iter().any(|c| c.id == connection.id) {
                return Err(StoreError::Duplicate(connection.id.clone()));
            }
            tracing::info!(connection_id = %connection.id, driver = %connection.driver, "Registered connection");
            data.connections.push(connection);
            Ok(())
        })
    }

    pub fn get_connection(&self, id: &str) -> Result<Option<Connection>, StoreError> {
        Ok(self.read()?.connections.iter().find(|c| c.id == id).cloned())
    }

    pub fn list_connections(&self) -> Result<Vec<Connection>, StoreError> {
        Ok(self.read()?.connections.clone())
    }

    /// Record the outcome of a health check.
    pub fn update_connection_status(
        &self,
        id: &str,
        status: ConnectionStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.mutate(|data| {
            let connection = data
                .connections
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| StoreError::connection_not_found(id))?;
            connection.status = status;
            connection.last_checked_at = Some(checked_at);
            Ok(())
        })
    }

    /// Delete a connection and every rule that references it.
    ///
    /// Pattern rules scoped to the connection are deleted; global ones stay.
    pub fn delete_connection(&self, id: &str) -> Result<(), StoreError> {
        self.mutate(|data| {
            let before = data.connections.len();
            data.connections.retain(|c| c.id != id);
            if data.connections.len() == before {
                return Err(StoreError::connection_not_found(id));
            }

            data.column_rules.retain(|r| r.connection_id != id);
            data.role_sets.retain(|s| s.connection_id != id);
            data.user_sets.retain(|s| s.connection_id != id);
            data.pattern_rules
                .retain(|p| p.connection_id.as_deref() != Some(id));

            tracing::info!(connection_id = id, "Deleted connection and its rules");
            Ok(())
        })
    }

    fn ensure_connection(data: &StoreData, id: &str) -> Result<(), StoreError> {
        if data.connections.iter().any(|c| c.id == id) {
            Ok(())
        } else {
            Err(StoreError::connection_not_found(id))
        }
    }

    // ---------------------------------------------------------------------
    // Column rules
    // ---------------------------------------------------------------------

    /// Create, overwrite or (for `EXPOSE`) delete the rule for one column.
    ///
    /// Returns the stored rule, or `None` when the column is now exposed.
    pub fn set_column_rule(
        &self,
        connection_id: &str,
        table: &str,
        column: &str,
        kind: RuleKind,
        replacement: Option<String>,
    ) -> Result<Option<ColumnRule>, StoreError> {
        self.mutate(|data| {
            Self::ensure_connection(data, connection_id)?;

            let matches = |r: &ColumnRule| {
                r.connection_id == connection_id
                    && r.table.eq_ignore_ascii_case(table)
                    && r.column.eq_ignore_ascii_case(column)
            };

            if kind == RuleKind::Expose {
                data.column_rules.retain(|r| !matches(r));
                tracing::debug!(connection_id, table, column, "Column exposed, rule removed");
                return Ok(None);
            }

            let mut rule = ColumnRule::new(connection_id, table, column, kind);
            rule.replacement = replacement;

            match data.column_rules.iter_mut().find(|r| matches(r)) {
                Some(existing) => *existing = rule.clone(),
                None => data.column_rules.push(rule.clone()),
            }
            tracing::debug!(connection_id, table, column, kind = %kind, "Column rule stored");
            Ok(Some(rule))
        })
    }

    pub fn column_rules(&self, connection_id: &str) -> Result<Vec<ColumnRule>, StoreError> {
        Ok(self
            .read()?
            .column_rules
            .iter()
            .filter(|r| r.connection_id == connection_id)
            .cloned()
            .collect())
    }

    // ---------------------------------------------------------------------
    // Role and user documents
    // ---------------------------------------------------------------------

    /// Store the role document for a connection, replacing any previous one.
    ///
    /// The document is decoded first and rejected if malformed.
    pub fn set_role_redaction_set(
        &self,
        role_id: &str,
        connection_id: &str,
        document: serde_json::Value,
    ) -> Result<(), StoreError> {
        RoleDocument::decode(&document).map_err(|e| StoreError::InvalidDocument(e.to_string()))?;

        self.mutate(|data| {
            Self::ensure_connection(data, connection_id)?;
            let set = RoleRedactionSet {
                role_id: role_id.to_string(),
                connection_id: connection_id.to_string(),
                document,
            };
            match data
                .role_sets
                .iter_mut()
                .find(|s| s.role_id == role_id && s.connection_id == connection_id)
            {
                Some(existing) => *existing = set,
                None => data.role_sets.push(set),
            }
            Ok(())
        })
    }

    /// Store the user document for a connection, replacing any previous one.
    pub fn set_user_redaction_set(
        &self,
        user_id: &str,
        connection_id: &str,
        rules: serde_json::Value,
    ) -> Result<(), StoreError> {
        decode_user_document(&rules).map_err(|e| StoreError::InvalidDocument(e.to_string()))?;

        self.mutate(|data| {
            Self::ensure_connection(data, connection_id)?;
            let set = UserRedactionSet {
                user_id: user_id.to_string(),
                connection_id: connection_id.to_string(),
                rules,
            };
            match data
                .user_sets
                .iter_mut()
                .find(|s| s.user_id == user_id && s.connection_id == connection_id)
            {
                Some(existing) => *existing = set,
                None => data.user_sets.push(set),
            }
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Pattern rules
    // ---------------------------------------------------------------------

    /// Add a pattern rule. The regex is compiled up front and rejected if invalid.
    pub fn add_pattern_rule(
        &self,
        name: &str,
        pattern: &str,
        replacement: Option<String>,
        role_id: Option<String>,
        connection_id: Option<String>,
    ) -> Result<PatternRule, StoreError> {
        regex::Regex::new(pattern).map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        self.mutate(|data| {
            if let Some(connection_id) = &connection_id {
                Self::ensure_connection(data, connection_id)?;
            }
            let rule = PatternRule {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                pattern: pattern.to_string(),
                replacement,
                role_id,
                connection_id,
            };
            data.pattern_rules.push(rule.clone());
            tracing::debug!(pattern_id = %rule.id, name, "Pattern rule added");
            Ok(rule)
        })
    }

    pub fn remove_pattern_rule(&self, id: &str) -> Result<(), StoreError> {
        self.mutate(|data| {
            let before = data.pattern_rules.len();
            data.pattern_rules.retain(|p| p.id != id);
            if data.pattern_rules.len() == before {
                return Err(StoreError::NotFound {
                    kind: "Pattern rule",
                    id: id.to_string(),
                });
            }
            Ok(())
        })
    }

    pub fn pattern_rules(&self) -> Result<Vec<PatternRule>, StoreError> {
        Ok(self.read()?.pattern_rules.clone())
    }
}

#[async_trait]
impl RuleSource for PolicyStore {
    async fn get_column_rules(&self, connection_id: &str) -> anyhow::Result<Vec<ColumnRule>> {
        Ok(self.column_rules(connection_id)?)
    }

    async fn get_role_redaction_sets(
        &self,
        connection_id: &str,
        role_ids: &[String],
    ) -> anyhow::Result<Vec<RoleRedactionSet>> {
        Ok(self
            .read()?
            .role_sets
            .iter()
            .filter(|s| s.connection_id == connection_id && role_ids.contains(&s.role_id))
            .cloned()
            .collect())
    }

    async fn get_user_redaction_set(
        &self,
        connection_id: &str,
        user_id: &str,
    ) -> anyhow::Result<Option<UserRedactionSet>> {
        Ok(self
            .read()?
            .user_sets
            .iter()
            .find(|s| s.connection_id == connection_id && s.user_id == user_id)
            .cloned())
    }

    async fn get_global_pattern_rules(&self, connection_id: &str) -> anyhow::Result<Vec<PatternRule>> {
        Ok(self
            .read()?
            .pattern_rules
            .iter()
            .filter(|p| p.connection_id.as_deref().is_none_or(|c| c == connection_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConnectionSource for PolicyStore {
    async fn get_connection(&self, id: &str) -> anyhow::Result<Option<Connection>> {
        Ok(PolicyStore::get_connection(self, id)?)
    }
}
