//! Redaction rule records as they are persisted.
//!
//! Role and user sets keep their raw JSON documents; decoding into
//! effective rules happens in `veil-policy`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What happens to a column value before it leaves the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// Clears a stored column rule. A role or user document entry naming
    /// the column still redacts it.
    #[serde(alias = "expose")]
    Expose,
    /// Value replaced with the mask token.
    #[serde(alias = "redact")]
    Redact,
    /// Email kept recognisable, interior characters masked.
    #[serde(alias = "mask_email")]
    MaskEmail,
    /// Column hidden from the schema entirely.
    #[serde(alias = "remove")]
    Remove,
    /// Value replaced with a fresh opaque token on every occurrence.
    #[serde(alias = "hash")]
    Hash,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expose => "EXPOSE",
            Self::Redact => "REDACT",
            Self::MaskEmail => "MASK_EMAIL",
            Self::Remove => "REMOVE",
            Self::Hash => "HASH",
        }
    }

}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a rule kind string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown redaction rule kind '{0}'")]
pub struct UnknownRuleKind(pub String);

impl FromStr for RuleKind {
    type Err = UnknownRuleKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "EXPOSE" => Ok(Self::Expose),
            "REDACT" => Ok(Self::Redact),
            "MASK_EMAIL" => Ok(Self::MaskEmail),
            "REMOVE" => Ok(Self::Remove),
            "HASH" => Ok(Self::Hash),
            _ => Err(UnknownRuleKind(s.to_string())),
        }
    }
}

/// Per-column rule, unique per (connection, table, column).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnRule {
    pub connection_id: String,
    pub table: String,
    pub column: String,
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl ColumnRule {
    pub fn new(
        connection_id: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        kind: RuleKind,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            table: table.into(),
            column: column.into(),
            kind,
            replacement: None,
        }
    }
}

/// Role-scoped redaction document, unique per (role, connection).
///
/// The document maps a table name (optionally schema-qualified) to either
/// an object of `{column: rule}` or an array of rule objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleRedactionSet {
    pub role_id: String,
    pub connection_id: String,
    pub document: serde_json::Value,
}

/// User-scoped redaction rules, unique per (user, connection).
///
/// `rules` is an array of `{table, column, rule, replacement?}` objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRedactionSet {
    pub user_id: String,
    pub connection_id: String,
    pub rules: serde_json::Value,
}

/// Regex-based rule applied to values regardless of column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternRule {
    pub id: String,
    pub name: String,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    /// Only applies to requests made under this role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    /// `None` means the rule is global.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
}
