//! Effective rule set and the precedence between rule sources.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use veil_core::RuleKind;

/// Where an effective rule came from.
///
/// Variants are declared in precedence order: when several sources name
/// the same (table, column), the earliest origin is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOrigin {
    /// Per-column rule stored against the connection.
    Column,
    /// Entry from one of the acting user's role documents.
    Role,
    /// Entry from the acting user's own document.
    User,
}

impl RuleOrigin {
    /// Concatenation order of the rule sources.
    // TODO: confirm with product owners whether user entries should override
    // column and role rules; first match in this order wins today.
    pub const PRECEDENCE: [RuleOrigin; 3] = [RuleOrigin::Column, RuleOrigin::Role, RuleOrigin::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Column => "column",
            Self::Role => "role",
            Self::User => "user",
        }
    }
}

/// One rule in the effective set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveRule {
    pub table: String,
    pub column: String,
    pub kind: RuleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    pub origin: RuleOrigin,
}

impl EffectiveRule {
    /// `table.column`
    pub fn column_id(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }

    pub fn matches(&self, table: &str, column: &str) -> bool {
        self.table.eq_ignore_ascii_case(table) && self.column.eq_ignore_ascii_case(column)
    }

    /// Kind applied to values. Every column named in the rule list is
    /// redacted, so an EXPOSE entry from a role or user document is masked
    /// like REDACT.
    // TODO: confirm with product owners whether document EXPOSE entries
    // should reveal the column instead; they redact today.
    pub fn applied_kind(&self) -> RuleKind {
        match self.kind {
            RuleKind::Expose => RuleKind::Redact,
            kind => kind,
        }
    }

    fn key(&self) -> (String, String) {
        (self.table.to_ascii_lowercase(), self.column.to_ascii_lowercase())
    }
}

/// Flattened rules for one request, in [`RuleOrigin::PRECEDENCE`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EffectiveRuleSet {
    rules: Vec<EffectiveRule>,
}

impl EffectiveRuleSet {
    /// Concatenate the three sources. Rules not already in precedence order are sorted stably.
    pub fn from_rules(mut rules: Vec<EffectiveRule>) -> Self {
        rules.sort_by_key(|r| r.origin);
        Self { rules }
    }

    /// Every rule, including shadowed ones.
    pub fn rules(&self) -> &[EffectiveRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The authoritative rule for (table, column): the first match.
    pub fn lookup(&self, table: &str, column: &str) -> Option<&EffectiveRule> {
        self.rules.iter().find(|r| r.matches(table, column))
    }

    /// One rule per (table, column), the first match for each, in precedence order.
    pub fn authoritative(&self) -> Vec<&EffectiveRule> {
        let mut seen = HashSet::new();
        self.rules.iter().filter(|r| seen.insert(r.key())).collect()
    }

    /// Authoritative rules of every redacted (table, column).
    ///
    /// Any column the list names is redacted, whatever the rule kind.
    pub fn redacting(&self) -> Vec<&EffectiveRule> {
        self.authoritative()
    }

    pub fn is_redacted(&self, table: &str, column: &str) -> bool {
        self.lookup(table, column).is_some()
    }

    /// Table name to redacted column names, lowercased: the union of every
    /// (table, column) in the list.
    pub fn redacted_columns(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for rule in &self.rules {
            let (table, column) = rule.key();
            map.entry(table).or_default().insert(column);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(table: &str, column: &str, kind: RuleKind, origin: RuleOrigin) -> EffectiveRule {
        EffectiveRule {
            table: table.to_string(),
            column: column.to_string(),
            kind,
            replacement: None,
            origin,
        }
    }

    #[test]
    fn test_precedence_order_matches_declaration() {
        let mut sorted = RuleOrigin::PRECEDENCE;
        sorted.sort();
        assert_eq!(sorted, RuleOrigin::PRECEDENCE);
    }

    #[test]
    fn test_first_match_wins() {
        let set = EffectiveRuleSet::from_rules(vec![
            rule("users", "email", RuleKind::Expose, RuleOrigin::User),
            rule("users", "email", RuleKind::Hash, RuleOrigin::Role),
            rule("users", "email", RuleKind::Redact, RuleOrigin::Column),
        ]);
        let winner = set.lookup("USERS", "Email").unwrap();
        assert_eq!(winner.kind, RuleKind::Redact);
        assert_eq!(winner.origin, RuleOrigin::Column);
        assert_eq!(set.authoritative().len(), 1);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_document_expose_is_still_redacted() {
        let set = EffectiveRuleSet::from_rules(vec![
            rule("orders", "total", RuleKind::Expose, RuleOrigin::Role),
            rule("orders", "total", RuleKind::Redact, RuleOrigin::User),
            rule("users", "ssn", RuleKind::Remove, RuleOrigin::User),
        ]);
        assert!(set.is_redacted("orders", "total"));
        assert!(set.is_redacted("users", "ssn"));
        assert!(!set.is_redacted("orders", "id"));

        let winner = set.lookup("orders", "total").unwrap();
        assert_eq!(winner.kind, RuleKind::Expose);
        assert_eq!(winner.applied_kind(), RuleKind::Redact);

        let redacted = set.redacted_columns();
        assert_eq!(redacted["orders"].iter().collect::<Vec<_>>(), vec!["total"]);
        assert_eq!(redacted["users"].iter().collect::<Vec<_>>(), vec!["ssn"]);
    }
}
