//! A backend-agnostic data access layer: named connections, typed schema views and
//! one query vocabulary dispatched to pluggable storage adapters.
//!
//! This crate is the core of the polystore project and provides:
//!
//! - **Query vocabulary** ([`query`]) - Filters, sort, limit/offset and projection shared by all backends
//! - **Adapter contract** ([`adapter`]) - The trait every storage backend implements
//! - **Connection registry** ([`connection`]) - Named connection descriptors and attached adapters
//! - **Schema registry** ([`schema`]) - Named, typed views of a collection bound to a connection
//! - **Query builder** ([`builder`]) - Per-invocation fluent builder returned by `Mapper::query`
//! - **Mapper context** ([`mapper`]) - Owns both registries; the entry point for callers
//! - **Error handling** ([`error`]) - Error taxonomy and result type
//!
//! # Example
//!
//! ```ignore
//! use polystore_core::{mapper::Mapper, connection::ConnectionType};
//! use serde_json::json;
//!
//! let mut mapper = Mapper::new();
//! mapper.connect("main", ConnectionType::Relational, credentials)?;
//! mapper.attach("main", adapter)?;
//! mapper
//!     .schema("users")?
//!     .bind("main", "users")
//!     .structure([("id", "int auto_increment"), ("name", "string editable")])?;
//!
//! let ada = mapper
//!     .query("users")?
//!     .filter("name", json!("Ada"))
//!     .get_one()
//!     .await?;
//! ```

pub mod adapter;
pub mod builder;
pub mod connection;
pub mod document;
pub mod error;
pub mod mapper;
pub mod query;
pub mod schema;
