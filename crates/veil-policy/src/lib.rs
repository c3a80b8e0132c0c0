//! # veil-policy
//!
//! Layered redaction policy for Veil.
//!
//! Four rule sources feed one effective policy per request:
//!
//! ```text
//!  column rules ─┐
//!  role docs ────┼─► EffectiveRuleSet ─► filtered schema (prompt)
//!  user doc ─────┘        │
//!                         ├─► unguarded_columns + Redactor (result rows)
//!  pattern rules ─────────┤
//!                         └─► assess_impact (audit)
//! ```
//!
//! Sources are concatenated in [`RuleOrigin::PRECEDENCE`] order and the
//! first rule naming a (table, column) is authoritative. Every column the
//! rules name is redacted. Pattern rules act on values and apply on top of
//! column rules.

pub mod document;
pub mod error;
pub mod impact;
pub mod mask;
pub mod precedence;
pub mod resolver;
pub mod screen;
pub mod source;

pub use document::{DecodedRule, RoleDocument, TableShape, decode_user_document};
pub use error::{DocumentError, PolicyError};
pub use impact::assess_impact;
pub use mask::{RandomTokenSource, Redactor, TokenSource, mask_email};
pub use precedence::{EffectiveRule, EffectiveRuleSet, RuleOrigin};
pub use resolver::{CompiledPattern, PolicyResolver, ResolvedPolicy};
pub use screen::unguarded_columns;
pub use source::RuleSource;
