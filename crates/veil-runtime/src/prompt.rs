//! Prompt construction for SQL generation and result summaries.
//!
//! The model only ever sees the filtered schema: redacted columns are not
//! listed, hinted at, or classified.

use crate::state::Failure;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::LazyLock;
use veil_core::{DriverKind, Row};
use veil_schema::SchemaSnapshot;

static FOREIGN_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z0-9_]+)_id$").expect("static regex"));

static TEMPORAL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(date|time|_at$|_on$|^year$|^month$)").expect("static regex")
});

static TEMPORAL_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(date|time|interval)").expect("static regex"));

static TEXTUAL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(name|title|label|description|city|country)").expect("static regex")
});

static TEXTUAL_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(char|text|string|clob)").expect("static regex"));

/// Inferred link from `<name>_id` to a table with an `id` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipHint {
    pub table: String,
    pub column: String,
    pub target_table: String,
}

impl std::fmt::Display for RelationshipHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} -> {}.id", self.table, self.column, self.target_table)
    }
}

/// Columns grouped by what they probably hold, as `table.column`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClasses {
    pub temporal: Vec<String>,
    pub textual: Vec<String>,
}

/// Link `<name>_id` columns to a table named `<name>` or its plural that has an `id` column.
pub fn relationship_hints(schema: &SchemaSnapshot) -> Vec<RelationshipHint> {
    let mut hints = Vec::new();
    for (table, columns) in &schema.tables {
        for column in columns {
            let Some(caps) = FOREIGN_KEY.captures(&column.name) else {
                continue;
            };
            let base = caps[1].to_ascii_lowercase();
            let candidates = [base.clone(), pluralize(&base)];

            let target = schema.tables.iter().find(|(name, cols)| {
                candidates.iter().any(|c| name.eq_ignore_ascii_case(c))
                    && cols.iter().any(|c| c.name.eq_ignore_ascii_case("id"))
            });
            if let Some((target_table, _)) = target {
                hints.push(RelationshipHint {
                    table: table.clone(),
                    column: column.name.clone(),
                    target_table: target_table.clone(),
                });
            }
        }
    }
    hints
}

/// Classify columns as date/time or name/text by name or declared type.
pub fn classify_columns(schema: &SchemaSnapshot) -> ColumnClasses {
    let mut classes = ColumnClasses::default();
    for (table, columns) in &schema.tables {
        for column in columns {
            let id = format!("{}.{}", table, column.name);
            if TEMPORAL_NAME.is_match(&column.name) || TEMPORAL_TYPE.is_match(&column.data_type) {
                classes.temporal.push(id);
            } else if TEXTUAL_NAME.is_match(&column.name) || TEXTUAL_TYPE.is_match(&column.data_type) {
                classes.textual.push(id);
            }
        }
    }
    classes
}

fn pluralize(s: &str) -> String {
    if s.ends_with('s') || s.ends_with('x') || s.ends_with("ch") || s.ends_with("sh") {
        format!("{}es", s)
    } else if s.ends_with('y') && !s.ends_with("ey") && !s.ends_with("ay") && !s.ends_with("oy") {
        format!("{}ies", &s[..s.len() - 1])
    } else {
        format!("{}s", s)
    }
}

/// System prompt for SQL generation.
pub fn generation_system_prompt(
    driver: DriverKind,
    schema: &SchemaSnapshot,
    table_notes: &BTreeMap<String, String>,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You translate questions into one read-only SQL SELECT statement for a {} database.",
        driver
    );
    prompt.push_str(
        "Reply with the SQL only: no explanation, no markdown, no trailing semicolon.\n\
         Use only the tables and columns listed below; nothing else is available.\n\
         Never write INSERT, UPDATE, DELETE, DROP, ALTER, TRUNCATE or CREATE.\n",
    );

    prompt.push_str("\nSchema:\n");
    for (table, columns) in &schema.tables {
        let cols: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.data_type))
            .collect();
        let _ = writeln!(prompt, "- {}({})", table, cols.join(", "));
    }

    let hints = relationship_hints(schema);
    if !hints.is_empty() {
        prompt.push_str("\nLikely relationships:\n");
        for hint in &hints {
            let _ = writeln!(prompt, "- {}", hint);
        }
    }

    let classes = classify_columns(schema);
    if !classes.temporal.is_empty() {
        let _ = writeln!(prompt, "\nDate/time columns: {}", classes.temporal.join(", "));
    }
    if !classes.textual.is_empty() {
        let _ = writeln!(prompt, "Name/text columns (match case-insensitively): {}", classes.textual.join(", "));
    }

    let notes: Vec<(&String, &String)> = table_notes
        .iter()
        .filter(|(table, _)| schema.has_table(table))
        .collect();
    if !notes.is_empty() {
        prompt.push_str("\nTable notes:\n");
        for (table, note) in notes {
            let _ = writeln!(prompt, "- {}: {}", table, note.trim());
        }
    }

    prompt
}

/// User prompt for SQL generation, with corrective guidance on retry.
pub fn generation_user_prompt(question: &str, previous: Option<&Failure>) -> String {
    let mut prompt = format!("Question: {}\n", question.trim());
    if let Some(failure) = previous {
        let _ = write!(
            prompt,
            "\nYour previous statement failed.\nStatement: {}\nError: {}\nReturn a corrected statement.\n",
            failure.sql, failure.error
        );
    }
    prompt
}

/// System prompt for result summaries.
pub const SUMMARY_SYSTEM_PROMPT: &str = "Summarize the query result for the user in one or two plain sentences. \
Some values are redacted or masked; never guess or reconstruct them.";

/// User prompt for result summaries. `sample` must already be redacted.
pub fn summary_user_prompt(question: &str, sql: &str, row_count: usize, sample: &[Row]) -> String {
    let sample = serde_json::to_string(sample).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Question: {}\nSQL: {}\nRows returned: {}\nSample rows: {}\n",
        question.trim(),
        sql,
        row_count,
        sample
    )
}

/// Summary used when no model summary is available.
pub fn generic_summary(row_count: usize) -> String {
    match row_count {
        1 => "The query returned 1 row.".to_string(),
        n => format!("The query returned {} rows.", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shop() -> SchemaSnapshot {
        SchemaSnapshot::new()
            .with_table("customers", &[("id", "integer"), ("full_name", "text"), ("joined_on", "date")])
            .with_table("orders", &[("id", "integer"), ("customer_id", "integer"), ("total", "numeric"), ("created_at", "timestamp")])
            .with_table("category", &[("id", "integer"), ("label", "varchar(40)")])
            .with_table("products", &[("sku", "text"), ("category_id", "integer"), ("vendor_id", "integer")])
    }

    #[test]
    fn test_relationship_hints() {
        let hints: Vec<String> = relationship_hints(&shop()).iter().map(|h| h.to_string()).collect();
        assert_eq!(
            hints,
            vec![
                "orders.customer_id -> customers.id",
                "products.category_id -> category.id",
            ]
        );
    }

    #[test]
    fn test_hint_requires_id_column() {
        let schema = SchemaSnapshot::new()
            .with_table("vendors", &[("code", "text")])
            .with_table("products", &[("vendor_id", "integer")]);
        assert!(relationship_hints(&schema).is_empty());
    }

    #[test]
    fn test_classify_columns() {
        let classes = classify_columns(&shop());
        assert_eq!(
            classes.temporal,
            vec!["customers.joined_on", "orders.created_at"]
        );
        assert_eq!(
            classes.textual,
            vec!["category.label", "customers.full_name", "products.sku"]
        );
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("customer"), "customers");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("key"), "keys");
    }

    #[test]
    fn test_system_prompt_lists_only_given_schema() {
        let schema = SchemaSnapshot::new().with_table("orders", &[("id", "integer"), ("total", "numeric")]);
        let mut notes = BTreeMap::new();
        notes.insert("orders".to_string(), "Completed orders only. ".to_string());
        notes.insert("payroll".to_string(), "Not visible".to_string());

        let prompt = generation_system_prompt(DriverKind::Postgres, &schema, &notes);
        assert!(prompt.contains("for a postgres database"));
        assert!(prompt.contains("- orders(id integer, total numeric)\n"));
        assert!(prompt.contains("- orders: Completed orders only.\n"));
        assert!(!prompt.contains("payroll"));
        assert!(!prompt.contains("Likely relationships"));
    }

    #[test]
    fn test_user_prompt_carries_previous_error() {
        assert_eq!(generation_user_prompt(" show all orders ", None), "Question: show all orders\n");

        let failure = Failure {
            sql: "SELECT nope FROM orders".to_string(),
            error: "column \"nope\" does not exist".to_string(),
        };
        let prompt = generation_user_prompt("show all orders", Some(&failure));
        assert!(prompt.contains("Statement: SELECT nope FROM orders"));
        assert!(prompt.contains("Error: column \"nope\" does not exist"));
    }

    #[test]
    fn test_generic_summary() {
        assert_eq!(generic_summary(1), "The query returned 1 row.");
        assert_eq!(generic_summary(0), "The query returned 0 rows.");
    }
}
