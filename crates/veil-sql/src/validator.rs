//! SELECT-only statement guard.

use crate::error::SqlGuardError;
use regex::Regex;
use std::sync::LazyLock;

/// Keywords that mark a write or DDL statement.
pub const BANNED_KEYWORDS: [&str; 7] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "CREATE",
];

static SELECT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SELECT\b").expect("static regex"));

static BANNED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({})\b", BANNED_KEYWORDS.join("|"))).expect("static regex")
});

/// Accept only a single read-only `SELECT`.
///
/// Checks run in order on the trimmed, uppercased text, so
/// `SELECT 1; DROP TABLE x` fails as multiple statements rather than DDL.
pub fn validate_select_only(sql: &str) -> Result<(), SqlGuardError> {
    let normalized = sql.trim().to_uppercase();

    if !SELECT_PREFIX.is_match(&normalized) {
        return Err(SqlGuardError::NotSelect);
    }

    if normalized.contains(';') {
        return Err(SqlGuardError::MultipleStatements);
    }

    if let Some(m) = BANNED.find(&normalized) {
        return Err(SqlGuardError::WriteOrDdl {
            keyword: m.as_str().to_string(),
        });
    }

    Ok(())
}

/// A statement that passed [`validate_select_only`].
///
/// The only way to build one is through validation, so anything holding a
/// `ValidatedSql` holds text that went through the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSql(String);

impl ValidatedSql {
    pub fn parse(sql: impl Into<String>) -> Result<Self, SqlGuardError> {
        let sql = sql.into();
        validate_select_only(&sql)?;
        Ok(Self(sql))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ValidatedSql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidatedSql {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_select_passes() {
        assert_eq!(validate_select_only("SELECT * FROM users"), Ok(()));
        assert_eq!(validate_select_only("  select id, total\nfrom orders  "), Ok(()));
    }

    #[test]
    fn test_stacked_statement_rejected() {
        assert_eq!(
            validate_select_only("SELECT 1; DROP TABLE x"),
            Err(SqlGuardError::MultipleStatements)
        );
        assert_eq!(
            validate_select_only("SELECT 1;"),
            Err(SqlGuardError::MultipleStatements)
        );
    }

    #[test]
    fn test_update_is_not_a_select() {
        let err = validate_select_only("UPDATE users SET x=1").unwrap_err();
        assert_eq!(err, SqlGuardError::NotSelect);
        assert_eq!(err.reason(), "not a SELECT");
    }

    #[test]
    fn test_cte_is_not_a_select() {
        assert_eq!(
            validate_select_only("WITH t AS (SELECT 1) SELECT * FROM t"),
            Err(SqlGuardError::NotSelect)
        );
    }

    #[test]
    fn test_banned_keyword_inside_select() {
        let err = validate_select_only("SELECT * FROM users WHERE id IN (DELETE FROM x RETURNING id)")
            .unwrap_err();
        assert_eq!(
            err,
            SqlGuardError::WriteOrDdl {
                keyword: "DELETE".to_string()
            }
        );
        assert_eq!(err.reason(), "write/DDL statement");
    }

    #[test]
    fn test_keywords_are_word_bounded() {
        // created_at / updated_by / deleted contain banned words as prefixes only
        assert_eq!(
            validate_select_only("SELECT created_at, updated_by, is_deleted FROM audit_rows"),
            Ok(())
        );
        assert_eq!(validate_select_only("SELECTED"), Err(SqlGuardError::NotSelect));
    }

    #[test]
    fn test_lexical_false_positive_is_rejected() {
        assert!(validate_select_only("SELECT * FROM notes WHERE body = 'please delete me'").is_err());
    }

    #[test]
    fn test_select_into_is_not_caught() {
        // Lexical gap: read-only credentials are the real boundary
        assert_eq!(validate_select_only("SELECT * INTO backup FROM users"), Ok(()));
        assert_eq!(
            validate_select_only("SELECT id INTO OUTFILE '/tmp/ids' FROM users"),
            Ok(())
        );
    }

    #[test]
    fn test_validated_sql_only_from_passing_text() {
        let sql = ValidatedSql::parse("SELECT id FROM orders").unwrap();
        assert_eq!(sql.as_str(), "SELECT id FROM orders");
        assert_eq!(
            ValidatedSql::parse("DROP TABLE orders"),
            Err(SqlGuardError::NotSelect)
        );
    }
}
