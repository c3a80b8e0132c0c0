//! `veil schema` command implementation.
//!
//! Prints what the model would be shown for a user: the filtered schema,
//! the relationship hints derived from it and the effective rule list in
//! precedence order.

use clap::Args;
use serde_json::json;

use super::print_json;
use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Connection id
    #[arg(long)]
    pub connection: String,

    #[arg(long, env = "VEIL_USER")]
    pub user: String,

    /// Role held by the user; repeat for several
    #[arg(long = "role")]
    pub roles: Vec<String>,
}

pub async fn run(ctx: &AppContext, args: SchemaArgs) -> anyhow::Result<()> {
    let pipeline = ctx.pipeline()?;
    let (connection, policy) = pipeline
        .resolve_policy(&args.connection, &args.user, &args.roles)
        .await?;

    let hints: Vec<String> = veil_runtime::relationship_hints(&policy.filtered_schema)
        .iter()
        .map(|h| h.to_string())
        .collect();
    let patterns: Vec<_> = policy
        .pattern_rules
        .iter()
        .map(|p| json!({ "id": p.id, "name": p.name, "pattern": p.regex.as_str() }))
        .collect();

    print_json(&json!({
        "connection": connection.id,
        "driver": connection.driver,
        "tables": policy.filtered_schema.tables,
        "relationships": hints,
        "removed": policy.removed,
        "rules": policy.effective_rules,
        "patterns": patterns,
    }))
}
