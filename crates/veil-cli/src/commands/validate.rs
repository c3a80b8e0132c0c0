//! `veil validate` command implementation.

use veil_sql::{extract_candidate_sql, validate_select_only};

/// Print `ok` or the rejection reason. Rejection is an error exit.
pub fn run(sql: &str) -> anyhow::Result<()> {
    let candidate = extract_candidate_sql(sql);
    match validate_select_only(&candidate) {
        Ok(()) => {
            println!("ok");
            Ok(())
        }
        Err(e) => {
            println!("{}", e);
            anyhow::bail!("statement rejected: {}", e.reason())
        }
    }
}
