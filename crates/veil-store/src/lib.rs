//! # veil-store
//!
//! Persistence for registered connections and the redaction rule sources:
//! column rules, role documents, user documents and pattern rules.
//!
//! The store is a single YAML file, loaded at open and rewritten after
//! every change:
//!
//! ```yaml
//! connections:
//!   - id: shop
//!     name: Shop replica
//!     driver: postgres
//!     owner_id: alice
//!     database_url_env: SHOP_DATABASE_URL
//! column_rules:
//!   - connection_id: shop
//!     table: orders
//!     column: customer_email
//!     kind: MASK_EMAIL
//! role_sets: []
//! user_sets: []
//! pattern_rules: []
//! ```
//!
//! [`PolicyStore`] implements [`veil_policy::RuleSource`] and
//! [`veil_core::ConnectionSource`] so the query pipeline reads from it directly.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{PolicyStore, StoreData};
