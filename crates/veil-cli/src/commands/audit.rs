//! `veil audit` command implementation.

use clap::Args;
use veil_audit::AuditFilter;

use super::print_json;
use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Only events by this actor
    #[arg(long)]
    pub actor: Option<String>,

    /// Only events on this connection
    #[arg(long)]
    pub connection: Option<String>,

    /// Most recent events to show
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub async fn run(ctx: &AppContext, args: AuditArgs) -> anyhow::Result<()> {
    let filter = AuditFilter {
        actor: args.actor,
        connection_id: args.connection,
        limit: Some(args.limit),
        ..Default::default()
    };
    print_json(&ctx.audit.query(filter).await?)
}
