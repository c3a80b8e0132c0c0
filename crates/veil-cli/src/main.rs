use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod completion;
mod context;

use commands::{ask, audit, connections, rules, schema, validate};

#[derive(Parser, Debug)]
#[command(name = "veil", version, about = "Guarded natural-language queries over redacted databases")]
struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(long, short, global = true, env = "VEIL_CONFIG", default_value = "veil.yaml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a question against a registered connection.
    Ask(ask::AskArgs),

    /// Show the schema and effective rules a user would see.
    Schema(schema::SchemaArgs),

    /// Check a statement with the SELECT-only guard.
    Validate {
        /// SQL text, optionally wrapped in a code fence
        sql: String,
    },

    /// Manage redaction rules.
    Rules(rules::RulesArgs),

    /// Manage registered connections.
    Connections(connections::ConnectionsArgs),

    /// Show recent audit events.
    Audit(audit::AuditArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let app = |path: &PathBuf| -> anyhow::Result<context::AppContext> {
        context::AppContext::new(context::load_config(path)?)
    };

    match cli.cmd {
        // The guard needs no configuration or store
        Command::Validate { sql } => validate::run(&sql),
        Command::Ask(args) => ask::run(&app(&cli.config)?, args).await,
        Command::Schema(args) => schema::run(&app(&cli.config)?, args).await,
        Command::Rules(args) => rules::run(&app(&cli.config)?, args).await,
        Command::Connections(args) => connections::run(&app(&cli.config)?, args).await,
        Command::Audit(args) => audit::run(&app(&cli.config)?, args).await,
    }
}
