//! Which rules actually affected an executed statement.

use crate::resolver::ResolvedPolicy;
use veil_core::RedactionImpact;
use veil_sql::mentions_identifier;

/// Compute the redaction impact of running `sql` under `policy`.
///
/// A redacting rule counts as applied when its column is mentioned in the
/// statement, or when its column was removed from the schema of a table
/// the statement references.
pub fn assess_impact(sql: &str, policy: &ResolvedPolicy) -> RedactionImpact {
    let referenced = policy.referenced_tables(sql);
    let mut impact = RedactionImpact::default();

    for rule in policy.effective_rules.redacting() {
        let explicit = mentions_identifier(sql, &rule.column);
        let implicit = referenced.iter().any(|t| t.eq_ignore_ascii_case(&rule.table))
            && policy.was_removed(&rule.table, &rule.column);

        if !(explicit || implicit) {
            continue;
        }

        let column_id = rule.column_id();
        if implicit {
            impact.record_removed(column_id.clone());
        }
        impact.record(rule.applied_kind(), column_id);
    }

    impact
}
