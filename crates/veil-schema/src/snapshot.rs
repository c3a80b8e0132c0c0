//! Schema snapshot types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A column as reported by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared SQL type, verbatim from the driver.
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Table name to ordered column list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, Vec<ColumnInfo>>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column to `table`, creating the table if needed.
    pub fn add_column(
        &mut self,
        table: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) {
        self.tables
            .entry(table.into())
            .or_default()
            .push(ColumnInfo::new(name, data_type));
    }

    /// Builder-style variant of [`add_column`](Self::add_column).
    pub fn with_table(mut self, table: &str, columns: &[(&str, &str)]) -> Self {
        let entry = self.tables.entry(table.to_string()).or_default();
        for (name, data_type) in columns {
            entry.push(ColumnInfo::new(*name, *data_type));
        }
        self
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn columns(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.tables.get(table).map(|c| c.as_slice())
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.keys().any(|t| t.eq_ignore_ascii_case(table))
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .iter()
            .filter(|(t, _)| t.eq_ignore_ascii_case(table))
            .flat_map(|(_, cols)| cols.iter())
            .any(|c| c.name.eq_ignore_ascii_case(column))
    }

    pub fn column_count(&self) -> usize {
        self.tables.values().map(|c| c.len()).sum()
    }

    /// Copy of the snapshot keeping only the columns for which `keep(table, column)` holds.
    ///
    /// Tables stay present even when every column is dropped.
    pub fn retain_columns(&self, keep: impl Fn(&str, &str) -> bool) -> SchemaSnapshot {
        let tables = self
            .tables
            .iter()
            .map(|(table, columns)| {
                let kept = columns
                    .iter()
                    .filter(|c| keep(table, &c.name))
                    .cloned()
                    .collect();
                (table.clone(), kept)
            })
            .collect();
        SchemaSnapshot { tables }
    }
}
