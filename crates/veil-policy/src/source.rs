//! Read access to stored redaction rules.

use async_trait::async_trait;
use veil_core::{ColumnRule, PatternRule, RoleRedactionSet, UserRedactionSet};

/// Read-only view of the four rule sources for one connection.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Column rules for the connection.
    async fn get_column_rules(&self, connection_id: &str) -> anyhow::Result<Vec<ColumnRule>>;

    /// Role documents for the connection, restricted to `role_ids`.
    async fn get_role_redaction_sets(
        &self,
        connection_id: &str,
        role_ids: &[String],
    ) -> anyhow::Result<Vec<RoleRedactionSet>>;

    /// The user's own document for the connection, if any.
    async fn get_user_redaction_set(
        &self,
        connection_id: &str,
        user_id: &str,
    ) -> anyhow::Result<Option<UserRedactionSet>>;

    /// Pattern rules scoped to the connection or unscoped.
    async fn get_global_pattern_rules(&self, connection_id: &str) -> anyhow::Result<Vec<PatternRule>>;
}
