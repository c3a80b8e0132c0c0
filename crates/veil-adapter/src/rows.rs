//! Driver rows to JSON objects.

use serde_json::{Value, json};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _};
use veil_core::Row;

/// Try each column against a list of Rust types, first match wins.
///
/// Values no listed type accepts are read as raw text, then as `null`.
macro_rules! row_decoder {
    ($(#[$meta:meta])* $name:ident, $row:ty, [$($ty:ty),+ $(,)?]) => {
        $(#[$meta])*
        pub fn $name(row: &$row) -> Row {
            let mut obj = Row::new();
            for col in row.columns() {
                let name = col.name();
                let value = 'decode: {
                    $(
                        if let Ok(v) = row.try_get::<Option<$ty>, _>(name) {
                            break 'decode v.map(|v| json!(v)).unwrap_or(Value::Null);
                        }
                    )+
                    match row.try_get_unchecked::<Option<String>, _>(name) {
                        Ok(Some(s)) => Value::String(s),
                        _ => Value::Null,
                    }
                };
                obj.insert(name.to_string(), value);
            }
            obj
        }
    };
}

row_decoder!(
    /// Decode a MySQL row. `DECIMAL` arrives as text.
    mysql_row_to_json,
    MySqlRow,
    [
        i64,
        u64,
        f64,
        f32,
        String,
        chrono::NaiveDateTime,
        chrono::NaiveDate,
        chrono::NaiveTime,
        chrono::DateTime<chrono::Utc>,
        serde_json::Value,
        bool,
    ]
);

row_decoder!(
    /// Decode a SQLite row by the storage class of each value.
    sqlite_row_to_json,
    SqliteRow,
    [i64, f64, String, bool]
);

/// Extract the object from a `SELECT to_json(t) AS row` result.
pub fn pg_json_row(row: &PgRow) -> anyhow::Result<Row> {
    match row.try_get::<Value, _>("row")? {
        Value::Object(obj) => Ok(obj),
        other => anyhow::bail!("expected a JSON object per row, got {}", other),
    }
}

/// Wrap a statement so Postgres renders each row as one JSON object.
pub fn pg_json_wrap(sql: &str) -> String {
    format!("SELECT to_json(t) AS row FROM ({}) AS t", sql)
}
