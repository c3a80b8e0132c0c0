//! `veil ask` command implementation.

use clap::Args;

use super::print_json;
use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Connection id
    #[arg(long)]
    pub connection: String,

    /// User asking the question
    #[arg(long, env = "VEIL_USER")]
    pub user: String,

    /// Role held by the user; repeat for several, highest priority first
    #[arg(long = "role")]
    pub roles: Vec<String>,

    /// The question
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,
}

/// Run the pipeline and print the response, or the exhaustion diagnostics.
pub async fn run(ctx: &AppContext, args: AskArgs) -> anyhow::Result<()> {
    let question = args.question.join(" ");
    let pipeline = ctx.pipeline()?;

    match pipeline
        .answer(&args.connection, &question, &args.user, &args.roles)
        .await
    {
        Ok(answer) => print_json(&answer),
        Err(e) => {
            if let Some(response) = e.exhausted_response() {
                print_json(&response)?;
            }
            Err(e.into())
        }
    }
}
