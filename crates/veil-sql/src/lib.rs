//! # veil-sql
//!
//! Lexical SQL checks for Veil.
//!
//! This crate provides functionality to:
//! - Reject anything but a single read-only `SELECT` (`validate_select_only`)
//! - Clean language-model output into a candidate statement
//! - Find which identifiers and tables a statement mentions
//!
//! ## Not a sandbox
//!
//! None of this parses SQL. The guard is a defense-in-depth filter over the
//! uppercased statement text:
//!
//! | Check | Rejection reason |
//! |-------|------------------|
//! | statement starts with `SELECT` | `not a SELECT` |
//! | no `;` anywhere | `multiple statements` |
//! | no `INSERT`/`UPDATE`/`DELETE`/`DROP`/`ALTER`/`TRUNCATE`/`CREATE` keyword | `write/DDL statement` |
//!
//! A statement that passes is still executed with whatever privileges the
//! configured credentials hold. Read-only database credentials remain the
//! actual boundary. `SELECT ... INTO` passes the keyword list, so on
//! Postgres `SELECT * INTO copy FROM t` creates a table and on MySQL
//! `SELECT ... INTO OUTFILE` writes a file on the database host. The filter
//! also has false positives: a string literal containing `delete` is
//! rejected.

pub mod error;
pub mod lexical;
pub mod validator;

pub use error::SqlGuardError;
pub use lexical::{extract_candidate_sql, mentions_identifier, referenced_tables, unqualified};
pub use validator::{BANNED_KEYWORDS, ValidatedSql, validate_select_only};
