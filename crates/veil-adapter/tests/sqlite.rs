//! Adapter tests against a throwaway SQLite file.
//!
//! Run with: cargo test --package veil-adapter --test sqlite

use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use veil_adapter::SqlxDriver;
use veil_core::{Connection, ConnectionStatus, DriverKind};
use veil_runtime::QueryExecutor;
use veil_schema::SchemaIntrospector;
use veil_sql::ValidatedSql;

async fn seeded_database() -> (TempDir, Connection) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("shop.db").display());

    let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
    for statement in [
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, full_name TEXT NOT NULL)",
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, customer_email TEXT, total REAL, note)",
        "INSERT INTO customers VALUES (1, 'Ada Lovelace')",
        "INSERT INTO orders VALUES (1, 1, 'ada@example.com', 19.5, NULL)",
        "INSERT INTO orders VALUES (2, 1, 'ada@example.com', 5, 'gift')",
    ] {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;

    let connection = Connection::new("shop", "Shop", DriverKind::Sqlite, "owner").with_database_url(url);
    (dir, connection)
}

#[tokio::test]
async fn test_introspect_sqlite() {
    let (_dir, connection) = seeded_database().await;

    let snapshot = SqlxDriver::new().introspect(&connection).await.unwrap();

    assert_eq!(snapshot.table_names(), vec!["customers", "orders"]);
    let columns: Vec<(String, String)> = snapshot
        .columns("orders")
        .unwrap()
        .iter()
        .map(|c| (c.name.clone(), c.data_type.clone()))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("id".to_string(), "INTEGER".to_string()),
            ("customer_id".to_string(), "INTEGER".to_string()),
            ("customer_email".to_string(), "TEXT".to_string()),
            ("total".to_string(), "REAL".to_string()),
            ("note".to_string(), "".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_execute_returns_json_rows() {
    let (_dir, connection) = seeded_database().await;
    let sql = ValidatedSql::parse("SELECT id, total, note FROM orders ORDER BY id").unwrap();

    let rows = SqlxDriver::new().execute(&connection, &sql).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], json!(1));
    assert_eq!(rows[0]["total"], json!(19.5));
    assert_eq!(rows[0]["note"], json!(null));
    assert_eq!(rows[1]["note"], json!("gift"));
}

#[tokio::test]
async fn test_execution_error_carries_driver_message() {
    let (_dir, connection) = seeded_database().await;
    let sql = ValidatedSql::parse("SELECT nope FROM orders").unwrap();

    let err = SqlxDriver::new().execute(&connection, &sql).await.unwrap_err();
    assert!(format!("{:#}", err).contains("nope"));
}

#[tokio::test]
async fn test_missing_url_is_an_error() {
    let connection = Connection::new("bare", "Bare", DriverKind::Sqlite, "owner");
    let err = SqlxDriver::new().introspect(&connection).await.unwrap_err();
    assert!(err.to_string().contains("has no database URL"));
}

#[tokio::test]
async fn test_health_check() {
    let (_dir, connection) = seeded_database().await;
    let driver = SqlxDriver::new();

    let status = driver.check_health(&connection).await;
    assert_eq!(status, ConnectionStatus::Reachable);

    let missing = Connection::new("gone", "Gone", DriverKind::Sqlite, "owner")
        .with_database_url("sqlite:///nonexistent/dir/none.db");
    let status = driver.check_health(&missing).await;
    assert_eq!(status, ConnectionStatus::Unreachable);
}
