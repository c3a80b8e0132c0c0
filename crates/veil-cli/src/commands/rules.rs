//! `veil rules` command implementation.
//!
//! Every change is written to the store and then recorded as a
//! `rule.changed` audit event.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use veil_core::RuleKind;

use super::print_json;
use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Actor recorded in the audit trail
    #[arg(long = "as", env = "VEIL_USER", default_value = "operator")]
    pub actor: String,

    #[command(subcommand)]
    pub cmd: RulesCommand,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Set the rule for one column. EXPOSE deletes the rule.
    SetColumn {
        connection: String,
        table: String,
        column: String,
        /// EXPOSE, REDACT, MASK_EMAIL, REMOVE or HASH
        kind: RuleKind,
        /// Replacement text for REDACT/REMOVE
        #[arg(long)]
        replacement: Option<String>,
    },

    /// Replace a role's redaction document (YAML or JSON file).
    SetRole {
        role: String,
        connection: String,
        file: PathBuf,
    },

    /// Replace a user's redaction document (YAML or JSON file).
    SetUser {
        user: String,
        connection: String,
        file: PathBuf,
    },

    /// Add a value pattern rule.
    AddPattern {
        #[arg(long)]
        name: String,
        /// Regular expression matched against every string value
        #[arg(long)]
        pattern: String,
        #[arg(long)]
        replacement: Option<String>,
        /// Only apply to users holding this role
        #[arg(long)]
        role: Option<String>,
        /// Only apply on this connection
        #[arg(long)]
        connection: Option<String>,
    },

    /// Remove a pattern rule by id.
    RemovePattern { id: String },

    /// List every rule that applies to a connection.
    List { connection: String },
}

pub async fn run(ctx: &AppContext, args: RulesArgs) -> Result<()> {
    let actor = args.actor.as_str();

    match args.cmd {
        RulesCommand::SetColumn {
            connection,
            table,
            column,
            kind,
            replacement,
        } => {
            let stored = ctx
                .store
                .set_column_rule(&connection, &table, &column, kind, replacement)?;
            match &stored {
                Some(rule) => println!("{}.{} -> {}", rule.table, rule.column, rule.kind),
                None => println!("{}.{} exposed", table, column),
            }
            record(
                ctx,
                actor,
                Some(&connection),
                json!({ "source": "column", "table": table, "column": column, "kind": kind }),
            )
            .await;
        }

        RulesCommand::SetRole { role, connection, file } => {
            let document = read_document(&file)?;
            ctx.store
                .set_role_redaction_set(&role, &connection, document)?;
            println!("Stored redaction document for role {}", role);
            record(ctx, actor, Some(&connection), json!({ "source": "role", "role": role })).await;
        }

        RulesCommand::SetUser { user, connection, file } => {
            let document = read_document(&file)?;
            ctx.store
                .set_user_redaction_set(&user, &connection, document)?;
            println!("Stored redaction document for user {}", user);
            record(ctx, actor, Some(&connection), json!({ "source": "user", "user": user })).await;
        }

        RulesCommand::AddPattern {
            name,
            pattern,
            replacement,
            role,
            connection,
        } => {
            let rule = ctx
                .store
                .add_pattern_rule(&name, &pattern, replacement, role, connection)?;
            println!("{}", rule.id);
            record(
                ctx,
                actor,
                rule.connection_id.as_deref(),
                json!({ "source": "pattern", "patternId": rule.id, "name": rule.name }),
            )
            .await;
        }

        RulesCommand::RemovePattern { id } => {
            ctx.store.remove_pattern_rule(&id)?;
            println!("Removed pattern rule {}", id);
            record(ctx, actor, None, json!({ "source": "pattern", "patternId": id, "removed": true })).await;
        }

        RulesCommand::List { connection } => {
            let data = ctx.store.snapshot()?;
            let column_rules: Vec<_> = data
                .column_rules
                .iter()
                .filter(|r| r.connection_id == connection)
                .collect();
            let role_sets: Vec<_> = data
                .role_sets
                .iter()
                .filter(|s| s.connection_id == connection)
                .collect();
            let user_sets: Vec<_> = data
                .user_sets
                .iter()
                .filter(|s| s.connection_id == connection)
                .collect();
            let pattern_rules: Vec<_> = data
                .pattern_rules
                .iter()
                .filter(|p| p.connection_id.as_deref().is_none_or(|c| c == connection))
                .collect();

            print_json(&json!({
                "columnRules": column_rules,
                "roleSets": role_sets,
                "userSets": user_sets,
                "patternRules": pattern_rules,
            }))?;
        }
    }

    Ok(())
}

fn read_document(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    // YAML is a superset of JSON
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse document: {}", path.display()))
}

async fn record(ctx: &AppContext, actor: &str, connection_id: Option<&str>, details: Value) {
    if let Err(e) = ctx.audit.log_rule_changed(actor, connection_id, details).await {
        warn!(error = %e, "Failed to record audit event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_document_accepts_yaml_and_json() {
        let dir = TempDir::new().unwrap();

        let yaml = dir.path().join("role.yaml");
        fs::write(&yaml, "orders:\n  customer_email: MASK_EMAIL\n").unwrap();
        assert_eq!(
            read_document(&yaml).unwrap(),
            json!({ "orders": { "customer_email": "MASK_EMAIL" } })
        );

        let json_path = dir.path().join("user.json");
        fs::write(&json_path, r#"[{"table":"orders","column":"total","rule":"HASH"}]"#).unwrap();
        assert_eq!(
            read_document(&json_path).unwrap(),
            json!([{ "table": "orders", "column": "total", "rule": "HASH" }])
        );
    }
}
