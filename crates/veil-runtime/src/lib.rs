//! # veil-runtime
//!
//! The guarded question-answering pipeline.
//!
//! ```text
//! answer(connection, question, user, roles)
//!   │
//!   ├─ schema cache ──► raw snapshot
//!   ├─ policy resolver ──► filtered schema + effective rules + patterns
//!   │
//!   ├─ attempt loop (at most 3)
//!   │    Draft ─► completion ─► Candidate ─► SELECT-only guard
//!   │       ▲                                   │
//!   │       └── previous SQL + error ◄── Rejected / ExecutionFailed
//!   │                                           │ Validated
//!   │                                           ▼
//!   │                                       executor ─► rows
//!   │
//!   ├─ cap rows (100) ─► redact ─► impact ─► summary (non-fatal)
//!   └─ audit event
//! ```
//!
//! The pipeline talks to the outside world through three traits:
//! [`QueryExecutor`], [`CompletionClient`] and
//! [`veil_schema::SchemaIntrospector`]. Tests substitute stubs for all three.

pub mod adapter;
pub mod completion;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod response;
pub mod state;

pub use adapter::QueryExecutor;
pub use completion::CompletionClient;
pub use error::PipelineError;
pub use pipeline::GuardedPipeline;
pub use prompt::{RelationshipHint, generic_summary, relationship_hints};
pub use response::{ExhaustedResponse, QueryAnswer};
pub use state::{AttemptState, Failure};
