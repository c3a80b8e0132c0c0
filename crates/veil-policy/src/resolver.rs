//! Merges the four rule sources into one effective policy.

use crate::document::{DecodedRule, RoleDocument, decode_user_document};
use crate::error::PolicyError;
use crate::precedence::{EffectiveRule, EffectiveRuleSet, RuleOrigin};
use crate::source::RuleSource;
use regex::Regex;
use std::sync::Arc;
use veil_core::PatternRule;
use veil_schema::SchemaSnapshot;

/// A pattern rule with its regex compiled.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub id: String,
    pub name: String,
    pub regex: Regex,
    pub replacement: Option<String>,
}

impl CompiledPattern {
    pub fn compile(rule: &PatternRule) -> Result<Self, regex::Error> {
        Ok(Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            regex: Regex::new(&rule.pattern)?,
            replacement: rule.replacement.clone(),
        })
    }
}

/// Policy for one (connection, user, roles) request.
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
    /// Schema with every redacted column removed.
    pub filtered_schema: SchemaSnapshot,
    pub effective_rules: EffectiveRuleSet,
    /// Value-level rules, applied independently of columns.
    pub pattern_rules: Vec<CompiledPattern>,
    /// `table.column` identifiers dropped from the schema, in schema order.
    pub removed: Vec<String>,
}

impl ResolvedPolicy {
    /// Table names visible to the model.
    pub fn available_tables(&self) -> Vec<String> {
        self.filtered_schema.table_names()
    }

    /// Known tables (from the schema or from rules) that `sql` mentions.
    pub fn referenced_tables(&self, sql: &str) -> Vec<String> {
        let mut candidates = self.filtered_schema.table_names();
        for rule in self.effective_rules.rules() {
            if !candidates.iter().any(|t| t.eq_ignore_ascii_case(&rule.table)) {
                candidates.push(rule.table.clone());
            }
        }
        veil_sql::referenced_tables(sql, candidates.iter().map(String::as_str))
    }

    /// Whether `table.column` was dropped from the schema.
    pub fn was_removed(&self, table: &str, column: &str) -> bool {
        self.removed.iter().any(|id| {
            id.split_once('.').is_some_and(|(t, c)| {
                t.eq_ignore_ascii_case(table) && c.eq_ignore_ascii_case(column)
            })
        })
    }
}

/// Resolves the effective redaction policy from a [`RuleSource`].
pub struct PolicyResolver {
    source: Arc<dyn RuleSource>,
}

impl PolicyResolver {
    pub fn new(source: Arc<dyn RuleSource>) -> Self {
        Self { source }
    }

    /// Resolve the policy for `user_id` acting under `role_ids` on a connection.
    ///
    /// The result depends only on the stored rules and `schema`; calling it
    /// twice with the same inputs gives identical output.
    pub async fn resolve(
        &self,
        connection_id: &str,
        user_id: &str,
        role_ids: &[String],
        schema: &SchemaSnapshot,
    ) -> Result<ResolvedPolicy, PolicyError> {
        let mut rules = Vec::new();

        // 1. Column rules
        for rule in self.source.get_column_rules(connection_id).await? {
            rules.push(EffectiveRule {
                table: veil_sql::unqualified(&rule.table).to_string(),
                column: rule.column,
                kind: rule.kind,
                replacement: rule.replacement,
                origin: RuleOrigin::Column,
            });
        }

        // 2. Role documents, in the order the roles were given
        let mut role_sets = self
            .source
            .get_role_redaction_sets(connection_id, role_ids)
            .await?;
        role_sets.retain(|s| role_ids.contains(&s.role_id));
        role_sets.sort_by_key(|s| role_ids.iter().position(|r| *r == s.role_id));
        for set in role_sets {
            let decoded = RoleDocument::decode(&set.document).map_err(|e| {
                PolicyError::MalformedDocument {
                    scope: RuleOrigin::Role.as_str(),
                    owner: set.role_id.clone(),
                    reason: e.to_string(),
                }
            })?;
            rules.extend(
                decoded
                    .into_rules()
                    .into_iter()
                    .map(|r| effective(r, RuleOrigin::Role)),
            );
        }

        // 3. User document
        if let Some(set) = self
            .source
            .get_user_redaction_set(connection_id, user_id)
            .await?
        {
            let decoded =
                decode_user_document(&set.rules).map_err(|e| PolicyError::MalformedDocument {
                    scope: RuleOrigin::User.as_str(),
                    owner: set.user_id.clone(),
                    reason: e.to_string(),
                })?;
            rules.extend(decoded.into_iter().map(|r| effective(r, RuleOrigin::User)));
        }

        // 4. Concatenated in precedence order; first match wins per (table, column)
        let effective_rules = EffectiveRuleSet::from_rules(rules);

        // 5-6. Remove redacted columns from the schema
        let filtered_schema = schema.retain_columns(|t, c| !effective_rules.is_redacted(t, c));
        let removed = schema
            .tables
            .iter()
            .flat_map(|(table, columns)| columns.iter().map(move |c| (table, &c.name)))
            .filter(|(t, c)| effective_rules.is_redacted(t, c))
            .map(|(t, c)| format!("{t}.{c}"))
            .collect();

        // 7. Pattern rules for this connection or global, and for one of the acting roles
        let pattern_rules = self
            .source
            .get_global_pattern_rules(connection_id)
            .await?
            .iter()
            .filter(|p| p.connection_id.as_deref().is_none_or(|c| c == connection_id))
            .filter(|p| p.role_id.as_ref().is_none_or(|r| role_ids.contains(r)))
            .filter_map(|p| match CompiledPattern::compile(p) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::warn!(pattern_id = %p.id, error = %e, "Skipping pattern rule with invalid regex");
                    None
                }
            })
            .collect();

        tracing::debug!(
            connection_id,
            user_id,
            rules = effective_rules.len(),
            redacted = effective_rules.redacting().len(),
            "Resolved redaction policy"
        );

        Ok(ResolvedPolicy {
            filtered_schema,
            effective_rules,
            pattern_rules,
            removed,
        })
    }
}

fn effective(rule: DecodedRule, origin: RuleOrigin) -> EffectiveRule {
    EffectiveRule {
        table: rule.table,
        column: rule.column,
        kind: rule.kind,
        replacement: rule.replacement,
        origin,
    }
}
