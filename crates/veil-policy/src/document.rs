//! Decoding of role and user redaction documents.
//!
//! Documents are stored as free-form JSON. They are decoded here, once,
//! into explicit shapes; anything that does not fit is an error rather
//! than being skipped or coerced.
//!
//! Role document, one entry per table (schema qualifier optional):
//!
//! ```json
//! {
//!   "public.users": { "email": "MASK_EMAIL", "ssn": { "rule": "REDACT", "replacement": "xxx" } },
//!   "orders": [ { "column": "card_number", "rule": "HASH" } ]
//! }
//! ```
//!
//! User document, already rule-shaped:
//!
//! ```json
//! [ { "table": "users", "column": "phone", "rule": "REMOVE" } ]
//! ```

use crate::error::DocumentError;
use serde_json::{Map, Value};
use veil_core::RuleKind;
use veil_sql::unqualified;

/// A rule kind plus its optional replacement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub kind: RuleKind,
    pub replacement: Option<String>,
}

/// One element of an array-shaped table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayEntry {
    pub column: String,
    pub spec: RuleSpec,
}

/// The two accepted shapes for a table entry in a role document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableShape {
    /// `{ "column": rule, ... }`
    ColumnMap(Vec<(String, RuleSpec)>),
    /// `[ { "column": ..., "rule": ... }, ... ]`
    Array(Vec<ArrayEntry>),
}

/// A rule decoded from a document, with its table unqualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRule {
    pub table: String,
    pub column: String,
    pub kind: RuleKind,
    pub replacement: Option<String>,
}

/// Decoded role redaction document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleDocument {
    pub tables: Vec<(String, TableShape)>,
}

impl RoleDocument {
    /// Decode a stored role document. `null` decodes to an empty document.
    pub fn decode(doc: &Value) -> Result<Self, DocumentError> {
        let entries = match doc {
            Value::Null => return Ok(Self::default()),
            Value::Object(entries) => entries,
            other => {
                return Err(DocumentError::new(format!(
                    "expected an object keyed by table, got {}",
                    type_name(other)
                )));
            }
        };

        let mut tables = Vec::with_capacity(entries.len());
        for (table, entry) in entries {
            let table = non_empty(unqualified(table), "table name")?;
            let shape = match entry {
                Value::Object(columns) => {
                    let mut decoded = Vec::with_capacity(columns.len());
                    for (column, spec) in columns {
                        let column = non_empty(column, "column name")?;
                        let spec = decode_spec(spec)
                            .map_err(|e| DocumentError::new(format!("{table}.{column}: {e}")))?;
                        decoded.push((column, spec));
                    }
                    TableShape::ColumnMap(decoded)
                }
                Value::Array(items) => {
                    let mut decoded = Vec::with_capacity(items.len());
                    for (idx, item) in items.iter().enumerate() {
                        let Value::Object(obj) = item else {
                            return Err(DocumentError::new(format!(
                                "{table}[{idx}]: expected a rule object, got {}",
                                type_name(item)
                            )));
                        };
                        let column = required_str(obj, "column")
                            .map_err(|e| DocumentError::new(format!("{table}[{idx}]: {e}")))?;
                        let spec = decode_rule_object(obj)
                            .map_err(|e| DocumentError::new(format!("{table}[{idx}]: {e}")))?;
                        decoded.push(ArrayEntry { column, spec });
                    }
                    TableShape::Array(decoded)
                }
                other => {
                    return Err(DocumentError::new(format!(
                        "{table}: expected a column map or an array, got {}",
                        type_name(other)
                    )));
                }
            };
            tables.push((table, shape));
        }

        Ok(Self { tables })
    }

    /// Flatten into one rule per (table, column) entry, in document order.
    pub fn into_rules(self) -> Vec<DecodedRule> {
        let mut rules = Vec::new();
        for (table, shape) in self.tables {
            match shape {
                TableShape::ColumnMap(columns) => {
                    for (column, spec) in columns {
                        rules.push(DecodedRule {
                            table: table.clone(),
                            column,
                            kind: spec.kind,
                            replacement: spec.replacement,
                        });
                    }
                }
                TableShape::Array(entries) => {
                    for entry in entries {
                        rules.push(DecodedRule {
                            table: table.clone(),
                            column: entry.column,
                            kind: entry.spec.kind,
                            replacement: entry.spec.replacement,
                        });
                    }
                }
            }
        }
        rules
    }
}

/// Decode a stored user document. `null` decodes to no rules.
pub fn decode_user_document(doc: &Value) -> Result<Vec<DecodedRule>, DocumentError> {
    let items = match doc {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(DocumentError::new(format!(
                "expected an array of rule objects, got {}",
                type_name(other)
            )));
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let Value::Object(obj) = item else {
                return Err(DocumentError::new(format!(
                    "[{idx}]: expected a rule object, got {}",
                    type_name(item)
                )));
            };
            let decode = || -> Result<DecodedRule, DocumentError> {
                let table = required_str(obj, "table")?;
                let column = required_str(obj, "column")?;
                let spec = decode_rule_object(obj)?;
                Ok(DecodedRule {
                    table: unqualified(&table).to_string(),
                    column,
                    kind: spec.kind,
                    replacement: spec.replacement,
                })
            };
            decode().map_err(|e| DocumentError::new(format!("[{idx}]: {e}")))
        })
        .collect()
}

fn decode_spec(spec: &Value) -> Result<RuleSpec, DocumentError> {
    match spec {
        Value::String(kind) => Ok(RuleSpec {
            kind: parse_kind(kind)?,
            replacement: None,
        }),
        Value::Object(obj) => decode_rule_object(obj),
        other => Err(DocumentError::new(format!(
            "expected a rule name or rule object, got {}",
            type_name(other)
        ))),
    }
}

fn decode_rule_object(obj: &Map<String, Value>) -> Result<RuleSpec, DocumentError> {
    let kind = ["rule", "type", "kind"]
        .iter()
        .find_map(|key| obj.get(*key))
        .ok_or_else(|| DocumentError::new("missing 'rule'"))?;
    let Value::String(kind) = kind else {
        return Err(DocumentError::new(format!(
            "'rule' must be a string, got {}",
            type_name(kind)
        )));
    };

    let replacement = match obj.get("replacement") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(DocumentError::new(format!(
                "'replacement' must be a string, got {}",
                type_name(other)
            )));
        }
    };

    Ok(RuleSpec {
        kind: parse_kind(kind)?,
        replacement,
    })
}

fn parse_kind(kind: &str) -> Result<RuleKind, DocumentError> {
    kind.parse::<RuleKind>()
        .map_err(|e| DocumentError::new(e.to_string()))
}

fn required_str(obj: &Map<String, Value>, key: &str) -> Result<String, DocumentError> {
    match obj.get(key) {
        Some(Value::String(s)) => non_empty(s, key),
        Some(other) => Err(DocumentError::new(format!(
            "'{key}' must be a string, got {}",
            type_name(other)
        ))),
        None => Err(DocumentError::new(format!("missing '{key}'"))),
    }
}

fn non_empty(value: &str, what: &str) -> Result<String, DocumentError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DocumentError::new(format!("empty {what}")));
    }
    Ok(value.to_string())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rule(table: &str, column: &str, kind: RuleKind) -> DecodedRule {
        DecodedRule {
            table: table.to_string(),
            column: column.to_string(),
            kind,
            replacement: None,
        }
    }

    #[test]
    fn test_column_map_shape() {
        let doc = json!({
            "public.users": {
                "email": "MASK_EMAIL",
                "ssn": { "rule": "REDACT", "replacement": "xxx-xx-xxxx" }
            }
        });
        let decoded = RoleDocument::decode(&doc).unwrap();
        assert!(matches!(decoded.tables[0].1, TableShape::ColumnMap(_)));

        let rules = decoded.into_rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0], rule("users", "email", RuleKind::MaskEmail));
        assert_eq!(rules[1].table, "users");
        assert_eq!(rules[1].kind, RuleKind::Redact);
        assert_eq!(rules[1].replacement.as_deref(), Some("xxx-xx-xxxx"));
    }

    #[test]
    fn test_array_shape() {
        let doc = json!({
            "orders": [
                { "column": "card_number", "rule": "hash" },
                { "column": "notes", "type": "REMOVE" }
            ]
        });
        let rules = RoleDocument::decode(&doc).unwrap().into_rules();
        assert_eq!(
            rules,
            vec![
                rule("orders", "card_number", RuleKind::Hash),
                rule("orders", "notes", RuleKind::Remove),
            ]
        );
    }

    #[test]
    fn test_null_documents_are_empty() {
        assert!(RoleDocument::decode(&Value::Null).unwrap().tables.is_empty());
        assert!(decode_user_document(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_role_documents_rejected() {
        let cases = [
            json!(["users"]),
            json!({ "users": "REDACT" }),
            json!({ "users": { "email": "SCRAMBLE" } }),
            json!({ "users": { "email": 7 } }),
            json!({ "users": [ { "rule": "REDACT" } ] }),
            json!({ "users": [ "email" ] }),
            json!({ "users": { "ssn": { "replacement": "x" } } }),
            json!({ "": { "ssn": "REDACT" } }),
        ];
        for doc in cases {
            assert!(RoleDocument::decode(&doc).is_err(), "accepted {doc}");
        }
    }

    #[test]
    fn test_error_names_location() {
        let err = RoleDocument::decode(&json!({ "users": [ { "column": "email" } ] })).unwrap_err();
        assert_eq!(err.to_string(), "users[0]: missing 'rule'");
    }

    #[test]
    fn test_user_document() {
        let doc = json!([
            { "table": "crm.users", "column": "phone", "rule": "REMOVE" },
            { "table": "users", "column": "email", "rule": "EXPOSE" }
        ]);
        let rules = decode_user_document(&doc).unwrap();
        assert_eq!(
            rules,
            vec![
                rule("users", "phone", RuleKind::Remove),
                rule("users", "email", RuleKind::Expose),
            ]
        );
    }

    #[test]
    fn test_malformed_user_documents_rejected() {
        assert!(decode_user_document(&json!({ "users": {} })).is_err());
        assert!(decode_user_document(&json!([ { "column": "phone", "rule": "REMOVE" } ])).is_err());
        let err = decode_user_document(&json!([ { "table": "users", "column": "phone", "rule": 1 } ]))
            .unwrap_err();
        assert_eq!(err.to_string(), "[0]: 'rule' must be a string, got a number");
    }
}
