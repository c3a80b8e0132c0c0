//! Redaction impact record attached to audit entries.

use crate::rules::RuleKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which columns were actually hidden, masked or hashed for one query.
///
/// Column identifiers are `table.column`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedactionImpact {
    pub hidden_columns: Vec<String>,
    pub masked_columns: Vec<String>,
    #[serde(rename = "hashApplied")]
    pub hashed_columns: Vec<String>,
    pub removed_from_schema: Vec<String>,
    /// Applied rule count per kind.
    pub rule_summary: BTreeMap<RuleKind, usize>,
}

impl RedactionImpact {
    /// Record one applied rule for `column_id`.
    pub fn record(&mut self, kind: RuleKind, column_id: impl Into<String>) {
        let column_id = column_id.into();
        match kind {
            RuleKind::Redact | RuleKind::Remove => push_unique(&mut self.hidden_columns, column_id),
            RuleKind::MaskEmail => push_unique(&mut self.masked_columns, column_id),
            RuleKind::Hash => push_unique(&mut self.hashed_columns, column_id),
            RuleKind::Expose => return,
        }
        *self.rule_summary.entry(kind).or_insert(0) += 1;
    }

    /// Record a column that was left out of the schema shown to the model.
    pub fn record_removed(&mut self, column_id: impl Into<String>) {
        push_unique(&mut self.removed_from_schema, column_id.into());
    }

    pub fn is_empty(&self) -> bool {
        self.rule_summary.is_empty() && self.removed_from_schema.is_empty()
    }

    pub fn total_applied(&self) -> usize {
        self.rule_summary.values().sum()
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
