//! Applying the resolved policy to result rows.

use crate::precedence::EffectiveRule;
use crate::resolver::ResolvedPolicy;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use veil_core::{RedactionConfig, Row, RuleKind};

/// Source of opaque tokens for `HASH` rules.
pub trait TokenSource: Send + Sync {
    /// A new token. Successive calls should not repeat.
    fn token(&self) -> String;
}

/// Random alphanumeric tokens from the thread-local generator.
#[derive(Debug, Clone)]
pub struct RandomTokenSource {
    length: usize,
}

impl RandomTokenSource {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }
}

impl Default for RandomTokenSource {
    fn default() -> Self {
        Self::new(16)
    }
}

impl TokenSource for RandomTokenSource {
    fn token(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// Mask an email address, keeping its shape.
///
/// Keeps the first character of the local part and of the domain plus the
/// last two characters of the domain. Returns `None` unless `value` has
/// exactly one `@` with text on both sides.
pub fn mask_email(value: &str, mask_char: char) -> Option<String> {
    let (local, domain) = value.split_once('@')?;
    if domain.contains('@') || local.is_empty() || domain.is_empty() {
        return None;
    }

    let local: Vec<char> = local.chars().collect();
    let domain: Vec<char> = domain.chars().collect();

    let mut out = String::with_capacity(value.len());
    out.push(local[0]);
    out.extend(std::iter::repeat_n(mask_char, local.len() - 1));
    out.push('@');
    out.push(domain[0]);
    if domain.len() > 3 {
        out.extend(std::iter::repeat_n(mask_char, domain.len() - 3));
        out.extend(&domain[domain.len() - 2..]);
    } else {
        out.extend(std::iter::repeat_n(mask_char, domain.len() - 1));
    }
    Some(out)
}

/// Rewrites row values according to a [`ResolvedPolicy`].
#[derive(Clone)]
pub struct Redactor {
    mask_token: String,
    mask_char: char,
    tokens: Arc<dyn TokenSource>,
}

impl Redactor {
    pub fn new(mask_token: impl Into<String>, mask_char: char, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            mask_token: mask_token.into(),
            mask_char,
            tokens,
        }
    }

    pub fn from_config(config: &RedactionConfig) -> Self {
        Self::new(
            config.mask_token.clone(),
            config.mask_char,
            Arc::new(RandomTokenSource::new(config.hash_token_length)),
        )
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Redact rows returned for `sql`.
    ///
    /// A row key is matched against the authoritative redacting rules of
    /// the tables the statement mentions, or of every table when it
    /// mentions none. Pattern rules then run over every string value.
    /// `null` stays `null`.
    pub fn redact(&self, rows: Vec<Row>, policy: &ResolvedPolicy, sql: &str) -> Vec<Row> {
        let plan = self.column_plan(policy, sql);
        if plan.is_empty() && policy.pattern_rules.is_empty() {
            return rows;
        }

        rows.into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(key, value)| {
                        let value = match plan.get(&key.to_ascii_lowercase()) {
                            Some(rule) => self.apply_rule(rule, value),
                            None => value,
                        };
                        let value = self.apply_patterns(policy, value);
                        (key, value)
                    })
                    .collect()
            })
            .collect()
    }

    /// Column name (lowercased) to the rule applied to it.
    fn column_plan<'a>(&self, policy: &'a ResolvedPolicy, sql: &str) -> HashMap<String, &'a EffectiveRule> {
        let redacting = policy.effective_rules.redacting();
        let referenced = policy.referenced_tables(sql);

        let in_scope = |rule: &&EffectiveRule| {
            referenced.is_empty() || referenced.iter().any(|t| t.eq_ignore_ascii_case(&rule.table))
        };

        let mut plan = HashMap::new();
        for rule in redacting.into_iter().filter(in_scope) {
            plan.entry(rule.column.to_ascii_lowercase()).or_insert(rule);
        }
        plan
    }

    fn apply_rule(&self, rule: &EffectiveRule, value: Value) -> Value {
        if value.is_null() {
            return value;
        }
        match rule.applied_kind() {
            RuleKind::MaskEmail => {
                let masked = value.as_str().and_then(|s| mask_email(s, self.mask_char));
                Value::String(masked.unwrap_or_else(|| self.mask_token.clone()))
            }
            RuleKind::Hash => Value::String(self.tokens.token()),
            // REMOVE columns should never be selected; if one is, it is redacted.
            RuleKind::Redact | RuleKind::Remove | RuleKind::Expose => Value::String(
                rule.replacement
                    .clone()
                    .unwrap_or_else(|| self.mask_token.clone()),
            ),
        }
    }

    fn apply_patterns(&self, policy: &ResolvedPolicy, value: Value) -> Value {
        let Value::String(s) = &value else {
            return value;
        };
        match policy.pattern_rules.iter().find(|p| p.regex.is_match(s)) {
            Some(pattern) => Value::String(
                pattern
                    .replacement
                    .clone()
                    .unwrap_or_else(|| self.mask_token.clone()),
            ),
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precedence::{EffectiveRuleSet, RuleOrigin};
    use crate::resolver::CompiledPattern;
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use veil_schema::SchemaSnapshot;

    struct SequentialTokens(AtomicUsize);

    impl TokenSource for SequentialTokens {
        fn token(&self) -> String {
            format!("tok-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn rule(table: &str, column: &str, kind: RuleKind) -> EffectiveRule {
        EffectiveRule {
            table: table.to_string(),
            column: column.to_string(),
            kind,
            replacement: None,
            origin: RuleOrigin::Column,
        }
    }

    fn policy(rules: Vec<EffectiveRule>, patterns: Vec<CompiledPattern>) -> ResolvedPolicy {
        ResolvedPolicy {
            filtered_schema: SchemaSnapshot::new()
                .with_table("users", &[("id", "integer")])
                .with_table("orders", &[("id", "integer")]),
            effective_rules: EffectiveRuleSet::from_rules(rules),
            pattern_rules: patterns,
            removed: Vec::new(),
        }
    }

    fn redactor() -> Redactor {
        Redactor::new("[REDACTED]", '*', Arc::new(SequentialTokens(AtomicUsize::new(0))))
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    #[test]
    fn test_mask_email() {
        let masked = mask_email("ab@example.com", '*').unwrap();
        assert_eq!(masked, "a*@e********om");
        assert_eq!(masked.matches('@').count(), 1);
        assert!(masked.starts_with('a'));
        assert!(masked.ends_with("om"));
        assert!(!masked.contains("xampl"));
    }

    #[test]
    fn test_mask_email_short_domain() {
        assert_eq!(mask_email("jo@a.b", '#').unwrap(), "j#@a##");
        assert_eq!(mask_email("x@yz", '*').unwrap(), "x@y*");
    }

    #[test]
    fn test_mask_email_rejects_non_emails() {
        assert_eq!(mask_email("not-an-email", '*'), None);
        assert_eq!(mask_email("a@b@c.com", '*'), None);
        assert_eq!(mask_email("@example.com", '*'), None);
        assert_eq!(mask_email("someone@", '*'), None);
    }

    #[test]
    fn test_each_rule_kind() {
        let mut redact = rule("users", "ssn", RuleKind::Redact);
        redact.replacement = Some("xxx-xx-xxxx".to_string());
        let policy = policy(
            vec![
                rule("users", "email", RuleKind::MaskEmail),
                rule("users", "phone", RuleKind::Hash),
                redact,
                rule("users", "password", RuleKind::Remove),
                rule("users", "name", RuleKind::Expose),
            ],
            Vec::new(),
        );
        let rows = vec![row(json!({
            "id": 1,
            "email": "ab@example.com",
            "phone": "555-0100",
            "ssn": "123-45-6789",
            "password": "hunter2",
            "name": "Ada"
        }))];

        let out = redactor().redact(rows, &policy, "SELECT * FROM users");
        assert_eq!(
            Value::Object(out[0].clone()),
            json!({
                "id": 1,
                "email": "a*@e********om",
                "phone": "tok-0",
                "ssn": "xxx-xx-xxxx",
                "password": "[REDACTED]",
                "name": "[REDACTED]"
            })
        );
    }

    #[test]
    fn test_hash_differs_per_occurrence() {
        let policy = policy(vec![rule("users", "phone", RuleKind::Hash)], Vec::new());
        let rows = vec![
            row(json!({ "phone": "555-0100" })),
            row(json!({ "phone": "555-0100" })),
        ];
        let out = redactor().redact(rows, &policy, "SELECT phone FROM users");
        assert_ne!(out[0]["phone"], json!("555-0100"));
        assert_ne!(out[0]["phone"], out[1]["phone"]);
    }

    #[test]
    fn test_random_tokens_differ() {
        let tokens = RandomTokenSource::new(16);
        let a = tokens.token();
        let b = tokens.token();
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_non_email_and_null_values() {
        let policy = policy(vec![rule("users", "email", RuleKind::MaskEmail)], Vec::new());
        let rows = vec![
            row(json!({ "email": "unknown" })),
            row(json!({ "email": null })),
            row(json!({ "email": 42 })),
        ];
        let out = redactor().redact(rows, &policy, "SELECT email FROM users");
        assert_eq!(out[0]["email"], json!("[REDACTED]"));
        assert_eq!(out[1]["email"], Value::Null);
        assert_eq!(out[2]["email"], json!("[REDACTED]"));
    }

    #[test]
    fn test_rules_scoped_to_referenced_tables() {
        let policy = policy(vec![rule("users", "id", RuleKind::Redact)], Vec::new());
        let out = redactor().redact(vec![row(json!({ "id": 7 }))], &policy, "SELECT id FROM orders");
        assert_eq!(out[0]["id"], json!(7));

        // No known table mentioned: every rule applies
        let out = redactor().redact(vec![row(json!({ "id": 7 }))], &policy, "SELECT 7 AS id");
        assert_eq!(out[0]["id"], json!("[REDACTED]"));
    }

    #[test]
    fn test_column_names_match_case_insensitively() {
        let policy = policy(vec![rule("users", "Email", RuleKind::Redact)], Vec::new());
        let out = redactor().redact(vec![row(json!({ "EMAIL": "a@b.co" }))], &policy, "SELECT email FROM users");
        assert_eq!(out[0]["EMAIL"], json!("[REDACTED]"));
    }

    #[test]
    fn test_first_pattern_match_wins() {
        let patterns = vec![
            CompiledPattern {
                id: "ssn".into(),
                name: "ssn".into(),
                regex: Regex::new(r"\d{3}-\d{2}-\d{4}").unwrap(),
                replacement: Some("<ssn>".into()),
            },
            CompiledPattern {
                id: "digits".into(),
                name: "digits".into(),
                regex: Regex::new(r"\d").unwrap(),
                replacement: None,
            },
        ];
        let policy = policy(Vec::new(), patterns);
        let rows = vec![row(json!({ "note": "ssn 123-45-6789", "other": "room 4", "plain": "none", "n": 5 }))];

        let out = redactor().redact(rows, &policy, "SELECT * FROM notes");
        assert_eq!(out[0]["note"], json!("<ssn>"));
        assert_eq!(out[0]["other"], json!("[REDACTED]"));
        assert_eq!(out[0]["plain"], json!("none"));
        assert_eq!(out[0]["n"], json!(5));
    }

    #[test]
    fn test_no_rules_leaves_rows_untouched() {
        let policy = policy(Vec::new(), Vec::new());
        let rows = vec![row(json!({ "id": 1, "email": "ab@example.com" }))];
        let out = redactor().redact(rows.clone(), &policy, "SELECT * FROM users");
        assert_eq!(out, rows);
    }
}
