//! Identifier-level text helpers.
//!
//! Everything here works on raw text with word boundaries, never on a
//! parse tree. `mentions_identifier("SELECT email_domain", "email")` is
//! false, while a mention inside a string literal still counts.

use regex::Regex;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("static regex"));

/// Turn raw completion text into a candidate statement.
///
/// Removes markdown code fences (with or without a language tag), trims
/// surrounding whitespace and drops a single trailing `;`.
pub fn extract_candidate_sql(raw: &str) -> String {
    let unfenced = FENCE.replace_all(raw, "");
    let trimmed = unfenced.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    trimmed.trim_end().to_string()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `identifier` appears in `sql` as a whole word, ignoring ASCII case.
pub fn mentions_identifier(sql: &str, identifier: &str) -> bool {
    if identifier.is_empty() {
        return false;
    }
    let haystack = sql.to_ascii_lowercase();
    let needle = identifier.to_ascii_lowercase();

    let mut from = 0;
    while let Some(offset) = haystack[from..].find(&needle) {
        let start = from + offset;
        let end = start + needle.len();
        let before_ok = haystack[..start].chars().next_back().is_none_or(|c| !is_ident_char(c));
        let after_ok = haystack[end..].chars().next().is_none_or(|c| !is_ident_char(c));
        if before_ok && after_ok {
            return true;
        }
        from = start + needle.len().max(1);
    }
    false
}

/// The subset of `tables` mentioned in `sql`, in input order.
pub fn referenced_tables<'a, I>(sql: &str, tables: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    tables
        .into_iter()
        .filter(|t| mentions_identifier(sql, unqualified(t)))
        .map(|t| t.to_string())
        .collect()
}

/// Strip schema qualification and identifier quoting: `"public"."Orders"` becomes `Orders`.
pub fn unqualified(name: &str) -> &str {
    let last = name.rsplit('.').next().unwrap_or(name).trim();
    last.trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']')
}
