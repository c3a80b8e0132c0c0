//! Keeps redacted columns from reaching result rows under another name.
//!
//! Values are redacted by matching row keys against rule column names, so a
//! redacted column is only safe when it comes back under its own name.

use crate::resolver::ResolvedPolicy;
use std::collections::HashSet;
use veil_core::Row;
use veil_sql::mentions_identifier;

/// Redacted columns, as `table.column`, that `sql` mentions but that the
/// rows may carry under a different key.
///
/// A mentioned column fails when no row key has its name, or when some row
/// key is not a plain column of the tables in scope, i.e. an alias or an
/// expression that may wrap it. Empty results pass.
pub fn unguarded_columns(sql: &str, policy: &ResolvedPolicy, rows: &[Row]) -> Vec<String> {
    let keys: HashSet<String> = rows
        .iter()
        .flat_map(|row| row.keys())
        .map(|k| k.to_ascii_lowercase())
        .collect();
    if keys.is_empty() {
        return Vec::new();
    }

    let referenced = policy.referenced_tables(sql);
    let in_scope = |table: &str| {
        referenced.is_empty() || referenced.iter().any(|t| t.eq_ignore_ascii_case(table))
    };

    let mentioned: Vec<_> = policy
        .effective_rules
        .redacting()
        .into_iter()
        .filter(|r| in_scope(&r.table) && mentions_identifier(sql, &r.column))
        .collect();
    if mentioned.is_empty() {
        return Vec::new();
    }

    let mut known: HashSet<String> = policy
        .filtered_schema
        .tables
        .iter()
        .filter(|(table, _)| in_scope(table))
        .flat_map(|(_, columns)| columns.iter().map(|c| c.name.to_ascii_lowercase()))
        .collect();
    known.extend(
        policy
            .removed
            .iter()
            .filter_map(|id| id.split_once('.'))
            .filter(|(table, _)| in_scope(table))
            .map(|(_, column)| column.to_ascii_lowercase()),
    );
    known.extend(mentioned.iter().map(|r| r.column.to_ascii_lowercase()));

    let derived = keys.iter().any(|k| !known.contains(k));

    let mut unguarded = Vec::new();
    for rule in mentioned {
        if derived || !keys.contains(&rule.column.to_ascii_lowercase()) {
            let id = rule.column_id();
            if !unguarded.contains(&id) {
                unguarded.push(id);
            }
        }
    }
    unguarded
}
