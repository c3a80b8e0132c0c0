//! # veil-schema
//!
//! Schema snapshots of target databases and a per-connection cache.
//!
//! A snapshot maps each table to its ordered `(column, declared type)` list.
//! Snapshots are introspected from the live database on a cache miss and
//! reused for a fixed time-to-live (5 minutes by default):
//!
//! ```text
//! get_schema(conn)
//!   ├─ hit, age < ttl ──► cached snapshot (no I/O)
//!   └─ miss / expired ──► introspector.introspect(conn)
//!                            ├─ Ok  ──► store (conn.id, now) ──► snapshot
//!                            └─ Err ──► IntrospectionFailed (nothing cached)
//! ```
//!
//! Concurrent misses for the same connection may each introspect and
//! overwrite the entry; introspection is read-only so the last writer wins.

pub mod cache;
pub mod error;
pub mod snapshot;

pub use cache::{Clock, SchemaCache, SchemaIntrospector, SystemClock};
pub use error::SchemaError;
pub use snapshot::{ColumnInfo, SchemaSnapshot};
