//! `veil` sub-command implementations.

pub mod ask;
pub mod audit;
pub mod connections;
pub mod rules;
pub mod schema;
pub mod validate;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
