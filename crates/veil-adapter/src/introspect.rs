use sqlx::{MySqlPool, PgPool, Row, SqlitePool};
use std::collections::BTreeMap;
use veil_schema::SchemaSnapshot;

/// Introspect a Postgres database, excluding system schemas.
///
/// Tables are keyed by unqualified name. When two schemas hold a table of
/// the same name, the first schema in alphabetical order wins.
pub async fn introspect_postgres(pool: &PgPool) -> anyhow::Result<SchemaSnapshot> {
    let rows = sqlx::query(
        r#"
        select table_schema, table_name, column_name, data_type
        from information_schema.columns
        where table_schema not in ('pg_catalog', 'information_schema')
        order by table_schema, table_name, ordinal_position
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut owner: BTreeMap<String, String> = BTreeMap::new();
    let mut snapshot = SchemaSnapshot::new();
    for row in rows {
        let table_schema: String = row.get("table_schema");
        let table_name: String = row.get("table_name");
        let column_name: String = row.get("column_name");
        let data_type: String = row.get("data_type");

        let claimed = owner
            .entry(table_name.clone())
            .or_insert_with(|| table_schema.clone());
        if *claimed != table_schema {
            tracing::debug!(table = %table_name, schema = %table_schema, "Skipping shadowed table");
            continue;
        }
        snapshot.add_column(table_name, column_name, data_type);
    }

    Ok(snapshot)
}

/// Introspect the current MySQL database.
pub async fn introspect_mysql(pool: &MySqlPool) -> anyhow::Result<SchemaSnapshot> {
    // information_schema columns come back as binary strings on some servers
    let rows = sqlx::query(
        r#"
        SELECT CAST(TABLE_NAME AS CHAR) AS table_name,
               CAST(COLUMN_NAME AS CHAR) AS column_name,
               CAST(COLUMN_TYPE AS CHAR) AS data_type
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = DATABASE()
        ORDER BY TABLE_NAME, ORDINAL_POSITION
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut snapshot = SchemaSnapshot::new();
    for row in rows {
        let table_name: String = row.try_get("table_name")?;
        let column_name: String = row.try_get("column_name")?;
        let data_type: String = row.try_get("data_type")?;
        snapshot.add_column(table_name, column_name, data_type);
    }
    Ok(snapshot)
}

/// Introspect a SQLite database, skipping internal `sqlite_` tables.
pub async fn introspect_sqlite(pool: &SqlitePool) -> anyhow::Result<SchemaSnapshot> {
    let rows = sqlx::query(
        r#"
        SELECT m.name AS table_name, p.name AS column_name, p.type AS data_type
        FROM sqlite_master m
        JOIN pragma_table_info(m.name) p
        WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%'
        ORDER BY m.name, p.cid
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut snapshot = SchemaSnapshot::new();
    for row in rows {
        let table_name: String = row.try_get("table_name")?;
        let column_name: String = row.try_get("column_name")?;
        // Columns declared without a type have an empty affinity name
        let data_type: String = row.try_get("data_type")?;
        snapshot.add_column(table_name, column_name, data_type);
    }
    Ok(snapshot)
}
