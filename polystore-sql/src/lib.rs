//! MySQL storage adapter for polystore.
//!
//! Translates the shared query vocabulary into parameterized SQL statements
//! and decodes result rows back into JSON documents. Statement construction
//! lives in [`statement`] as pure functions; [`adapter`] owns the connection
//! lifecycle (one short-lived connection per operation).

pub mod adapter;
pub mod statement;
pub mod types;

pub use adapter::{SqlAdapter, SqlConfig};
