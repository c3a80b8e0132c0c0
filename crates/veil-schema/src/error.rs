//! Error types for the schema crate.

use thiserror::Error;

/// Errors that can occur while fetching a schema snapshot.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The target database could not be introspected.
    #[error("failed to introspect schema for connection {connection_id}: {message}")]
    IntrospectionFailed {
        connection_id: String,
        message: String,
    },
}
