//! # veil-adapter
//!
//! Postgres, MySQL and SQLite access through sqlx.
//!
//! [`SqlxDriver`] implements both [`SchemaIntrospector`] and
//! [`QueryExecutor`]. Every operation opens a single-connection pool for
//! the target, does its work and closes the pool again; connections are
//! registered and removed at runtime, so nothing is kept open between
//! requests.
//!
//! Row values are converted to JSON. Postgres renders rows server-side with
//! `to_json`; MySQL and SQLite rows are decoded column by column.

use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use std::time::Duration;
use veil_core::{Connection, ConnectionStatus, DriverKind, Row};
use veil_runtime::QueryExecutor;
use veil_schema::{SchemaIntrospector, SchemaSnapshot};
use veil_sql::ValidatedSql;

pub mod introspect;
pub mod rows;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connects to target databases on demand.
#[derive(Debug, Clone)]
pub struct SqlxDriver {
    connect_timeout: Duration,
}

impl Default for SqlxDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlxDriver {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn url(connection: &Connection) -> anyhow::Result<String> {
        connection.connection_string().ok_or_else(|| {
            anyhow::anyhow!(
                "connection '{}' has no database URL (set database_url or database_url_env)",
                connection.id
            )
        })
    }

    /// Run `SELECT 1` against the target and report whether it answered.
    pub async fn check_health(&self, connection: &Connection) -> ConnectionStatus {
        match self.ping(connection).await {
            Ok(()) => ConnectionStatus::Reachable,
            Err(e) => {
                tracing::warn!(connection_id = %connection.id, error = %format!("{:#}", e), "Health check failed");
                ConnectionStatus::Unreachable
            }
        }
    }

    async fn ping(&self, connection: &Connection) -> anyhow::Result<()> {
        let url = Self::url(connection)?;
        match connection.driver {
            DriverKind::Postgres => {
                let pool = self.pg_pool(&url).await?;
                let result = sqlx::query("SELECT 1").execute(&pool).await;
                pool.close().await;
                result?;
            }
            DriverKind::Mysql => {
                let pool = self.mysql_pool(&url).await?;
                let result = sqlx::query("SELECT 1").execute(&pool).await;
                pool.close().await;
                result?;
            }
            DriverKind::Sqlite => {
                let pool = self.sqlite_pool(&url).await?;
                let result = sqlx::query("SELECT 1").execute(&pool).await;
                pool.close().await;
                result?;
            }
        }
        Ok(())
    }

    async fn pg_pool(&self, url: &str) -> anyhow::Result<sqlx::PgPool> {
        Ok(PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.connect_timeout)
            .connect(url)
            .await?)
    }

    async fn mysql_pool(&self, url: &str) -> anyhow::Result<sqlx::MySqlPool> {
        Ok(MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.connect_timeout)
            .connect(url)
            .await?)
    }

    async fn sqlite_pool(&self, url: &str) -> anyhow::Result<sqlx::SqlitePool> {
        Ok(SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.connect_timeout)
            .connect(url)
            .await?)
    }
}

#[async_trait]
impl SchemaIntrospector for SqlxDriver {
    async fn introspect(&self, connection: &Connection) -> anyhow::Result<SchemaSnapshot> {
        let url = Self::url(connection)?;
        tracing::debug!(connection_id = %connection.id, driver = %connection.driver, "Introspecting schema");

        match connection.driver {
            DriverKind::Postgres => {
                let pool = self.pg_pool(&url).await?;
                let result = introspect::introspect_postgres(&pool).await;
                pool.close().await;
                result
            }
            DriverKind::Mysql => {
                let pool = self.mysql_pool(&url).await?;
                let result = introspect::introspect_mysql(&pool).await;
                pool.close().await;
                result
            }
            DriverKind::Sqlite => {
                let pool = self.sqlite_pool(&url).await?;
                let result = introspect::introspect_sqlite(&pool).await;
                pool.close().await;
                result
            }
        }
    }
}

#[async_trait]
impl QueryExecutor for SqlxDriver {
    async fn execute(&self, connection: &Connection, sql: &ValidatedSql) -> anyhow::Result<Vec<Row>> {
        let url = Self::url(connection)?;

        let rows = match connection.driver {
            DriverKind::Postgres => {
                let pool = self.pg_pool(&url).await?;
                let wrapped = rows::pg_json_wrap(sql.as_str());
                let result = sqlx::query(&wrapped).fetch_all(&pool).await;
                pool.close().await;
                result?
                    .iter()
                    .map(rows::pg_json_row)
                    .collect::<anyhow::Result<Vec<_>>>()?
            }
            DriverKind::Mysql => {
                let pool = self.mysql_pool(&url).await?;
                let result = sqlx::query(sql.as_str()).fetch_all(&pool).await;
                pool.close().await;
                result?.iter().map(rows::mysql_row_to_json).collect()
            }
            DriverKind::Sqlite => {
                let pool = self.sqlite_pool(&url).await?;
                let result = sqlx::query(sql.as_str()).fetch_all(&pool).await;
                pool.close().await;
                result?.iter().map(rows::sqlite_row_to_json).collect()
            }
        };

        tracing::debug!(connection_id = %connection.id, row_count = rows.len(), "Statement returned rows");
        Ok(rows)
    }
}
