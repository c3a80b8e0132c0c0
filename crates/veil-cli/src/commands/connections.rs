//! `veil connections` command implementation.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use tracing::{info, warn};
use veil_core::{Connection, DriverKind};

use super::print_json;
use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct ConnectionsArgs {
    /// Actor recorded as owner and in the audit trail
    #[arg(long = "as", env = "VEIL_USER", default_value = "operator")]
    pub actor: String,

    #[command(subcommand)]
    pub cmd: ConnectionsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConnectionsCommand {
    /// Register a target database.
    Add {
        id: String,
        /// postgres, mysql or sqlite
        #[arg(long)]
        driver: DriverKind,
        /// Display name (defaults to the id)
        #[arg(long)]
        name: Option<String>,
        /// Environment variable holding the database URL
        #[arg(long, conflicts_with = "url")]
        url_env: Option<String>,
        /// Database URL stored as-is
        #[arg(long)]
        url: Option<String>,
        /// Note shown to the model for a table, as TABLE=TEXT; repeatable
        #[arg(long = "note", value_parser = parse_note)]
        notes: Vec<(String, String)>,
    },

    /// List registered connections.
    List,

    /// Check connections and record whether they answered.
    Check {
        /// Only this connection
        id: Option<String>,
    },

    /// Remove a connection and every rule scoped to it.
    Remove { id: String },
}

fn parse_note(s: &str) -> Result<(String, String), String> {
    let (table, note) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TABLE=TEXT, got '{}'", s))?;
    if table.trim().is_empty() {
        return Err("table name must not be empty".to_string());
    }
    Ok((table.trim().to_string(), note.trim().to_string()))
}

pub async fn run(ctx: &AppContext, args: ConnectionsArgs) -> Result<()> {
    match args.cmd {
        ConnectionsCommand::Add {
            id,
            driver,
            name,
            url_env,
            url,
            notes,
        } => {
            if url_env.is_none() && url.is_none() {
                anyhow::bail!("either --url or --url-env is required");
            }

            let mut connection = Connection::new(&id, name.unwrap_or_else(|| id.clone()), driver, &args.actor);
            connection.database_url_env = url_env;
            connection.database_url = url;
            for (table, note) in notes {
                connection = connection.with_table_note(table, note);
            }

            ctx.store.register_connection(connection)?;
            println!("Registered connection {}", id);
        }

        ConnectionsCommand::List => {
            print_json(&ctx.store.list_connections()?)?;
        }

        ConnectionsCommand::Check { id } => {
            let connections: Vec<Connection> = ctx
                .store
                .list_connections()?
                .into_iter()
                .filter(|c| id.as_deref().is_none_or(|id| c.id == id))
                .collect();
            if let Some(id) = &id
                && connections.is_empty()
            {
                anyhow::bail!("connection not found: {}", id);
            }

            for connection in connections {
                let status = ctx.driver.check_health(&connection).await;
                ctx.store
                    .update_connection_status(&connection.id, status, Utc::now())?;
                info!(connection_id = %connection.id, ?status, "Health check recorded");
                println!("{}\t{:?}", connection.id, status);
            }
        }

        ConnectionsCommand::Remove { id } => {
            ctx.store.delete_connection(&id)?;
            if let Err(e) = ctx.audit.log_connection_removed(&args.actor, &id).await {
                warn!(error = %e, "Failed to record audit event");
            }
            println!("Removed connection {}", id);
        }
    }

    Ok(())
}
