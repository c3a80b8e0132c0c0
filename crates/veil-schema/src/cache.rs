//! Time-bounded schema snapshot cache.

use crate::error::SchemaError;
use crate::snapshot::SchemaSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use veil_core::Connection;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reads tables and columns from a live target database.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Open a transient connection, enumerate tables and columns, close it.
    async fn introspect(&self, connection: &Connection) -> anyhow::Result<SchemaSnapshot>;
}

#[derive(Clone)]
struct CachedSnapshot {
    snapshot: Arc<SchemaSnapshot>,
    fetched_at: DateTime<Utc>,
}

/// Per-connection schema cache with a fixed time-to-live.
///
/// Failed introspections are never cached.
pub struct SchemaCache {
    introspector: Arc<dyn SchemaIntrospector>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedSnapshot>>,
}

impl SchemaCache {
    /// Default time-to-live for cached snapshots.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    pub fn new(introspector: Arc<dyn SchemaIntrospector>) -> Self {
        Self {
            introspector,
            clock: Arc::new(SystemClock),
            ttl: Self::DEFAULT_TTL,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the schema snapshot for a connection, introspecting on miss or expiry.
    pub async fn get_schema(
        &self,
        connection: &Connection,
    ) -> Result<Arc<SchemaSnapshot>, SchemaError> {
        let now = self.clock.now();

        let cached = self.entries.read().await.get(&connection.id).cloned();
        if let Some(cached) = cached
            && self.is_fresh(&cached, now)
        {
            tracing::debug!(connection_id = %connection.id, "Schema cache hit");
            return Ok(cached.snapshot);
        }

        tracing::debug!(connection_id = %connection.id, driver = %connection.driver, "Schema cache miss, introspecting");

        // The lock is not held across introspection; concurrent misses may
        // each introspect and the last one to finish wins.
        let snapshot = self
            .introspector
            .introspect(connection)
            .await
            .map_err(|e| SchemaError::IntrospectionFailed {
                connection_id: connection.id.clone(),
                message: format!("{:#}", e),
            })?;

        let snapshot = Arc::new(snapshot);
        self.entries.write().await.insert(
            connection.id.clone(),
            CachedSnapshot {
                snapshot: snapshot.clone(),
                fetched_at: self.clock.now(),
            },
        );

        tracing::info!(
            connection_id = %connection.id,
            tables = snapshot.tables.len(),
            columns = snapshot.column_count(),
            "Schema snapshot cached"
        );

        Ok(snapshot)
    }

    /// Drop the cached snapshot for a connection.
    pub async fn invalidate(&self, connection_id: &str) {
        self.entries.write().await.remove(connection_id);
    }

    /// Drop every cached snapshot.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    fn is_fresh(&self, cached: &CachedSnapshot, now: DateTime<Utc>) -> bool {
        // A clock that moved backwards yields a negative age, treated as expired.
        now.signed_duration_since(cached.fetched_at)
            .to_std()
            .map(|age| age < self.ttl)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use veil_core::DriverKind;

    struct FixedClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
            }
        }

        fn advance(&self, secs: i64) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[derive(Default)]
    struct CountingIntrospector {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl SchemaIntrospector for CountingIntrospector {
        async fn introspect(&self, _connection: &Connection) -> anyhow::Result<SchemaSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("connection refused");
            }
            Ok(SchemaSnapshot::new().with_table("orders", &[("id", "integer"), ("total", "numeric")]))
        }
    }

    fn setup() -> (Arc<CountingIntrospector>, Arc<FixedClock>, SchemaCache) {
        let introspector = Arc::new(CountingIntrospector::default());
        let clock = Arc::new(FixedClock::new());
        let cache = SchemaCache::new(introspector.clone()).with_clock(clock.clone());
        (introspector, clock, cache)
    }

    fn conn(id: &str) -> Connection {
        Connection::new(id, id, DriverKind::Postgres, "alice")
    }

    #[tokio::test]
    async fn test_hit_within_ttl_does_no_io() {
        let (introspector, clock, cache) = setup();
        let c = conn("c1");

        let first = cache.get_schema(&c).await.unwrap();
        clock.advance(299);
        let second = cache.get_schema(&c).await.unwrap();

        assert_eq!(introspector.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let (introspector, clock, cache) = setup();
        let c = conn("c1");

        cache.get_schema(&c).await.unwrap();
        clock.advance(300);
        cache.get_schema(&c).await.unwrap();

        assert_eq!(introspector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_entries_are_per_connection() {
        let (introspector, _clock, cache) = setup();
        cache.get_schema(&conn("c1")).await.unwrap();
        cache.get_schema(&conn("c2")).await.unwrap();
        cache.get_schema(&conn("c1")).await.unwrap();
        assert_eq!(introspector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let (introspector, _clock, cache) = setup();
        let c = conn("c1");

        introspector.fail.store(true, Ordering::SeqCst);
        let err = cache.get_schema(&c).await.unwrap_err();
        assert!(matches!(err, SchemaError::IntrospectionFailed { ref connection_id, .. } if connection_id == "c1"));
        assert!(err.to_string().contains("connection refused"));

        // Next call retries immediately and succeeds.
        introspector.fail.store(false, Ordering::SeqCst);
        cache.get_schema(&c).await.unwrap();
        assert_eq!(introspector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (introspector, _clock, cache) = setup();
        let c = conn("c1");
        cache.get_schema(&c).await.unwrap();
        cache.invalidate("c1").await;
        cache.get_schema(&c).await.unwrap();
        assert_eq!(introspector.calls.load(Ordering::SeqCst), 2);
    }
}
