//! Main polystore crate providing one data-access layer over many backends.
//!
//! This crate is the primary entry point for users of the polystore project.
//! It re-exports the core registries, the query builder and the storage
//! adapters, so application code depends on a single crate.
//!
//! # Features
//!
//! - **Named connections** - Register backend credentials once, refer to them by name
//! - **Typed schemas** - Bind a named field structure to a collection on a connection
//! - **One query vocabulary** - Filters, sort, paging and projection shared by all backends
//! - **Pluggable adapters** - Relational, MongoDB, Firestore, HTTP API and in-memory
//!
//! # Quick Start
//!
//! ```ignore
//! use polystore::{prelude::*, memory::MemoryAdapter};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> DataResult<()> {
//!     let mut mapper = Mapper::new();
//!
//!     // Register a connection and attach its adapter.
//!     mapper.connect("main", ConnectionType::Relational, CredentialMap::new())?;
//!     mapper.attach("main", Arc::new(MemoryAdapter::new()))?;
//!
//!     // Describe the collection.
//!     mapper
//!         .schema("users")?
//!         .bind("main", "users")
//!         .structure([
//!             ("id", "int auto_increment"),
//!             ("name", "string editable"),
//!             ("age", "number editable"),
//!         ])?;
//!
//!     // Insert and query.
//!     let id = mapper
//!         .query("users")?
//!         .add(json!({"name": "Ada", "age": 36}).as_object().unwrap().clone())
//!         .await?;
//!
//!     let ada = mapper
//!         .query("users")?
//!         .filter("id", json!(id))
//!         .get_one()
//!         .await?;
//!     println!("found: {ada:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`sql`] - MySQL-compatible relational databases (requires `sql` feature)
//! - [`mongodb`] - MongoDB deployments (requires `mongodb` feature)
//! - [`firestore`] - Google Cloud Firestore via REST (requires `firestore` feature)
//! - [`http`] - Generic REST-style HTTP APIs (requires `http` feature)

pub mod prelude;

pub use polystore_core::{adapter, builder, connection, document, error, mapper, query, schema};

/// In-memory storage adapter.
pub mod memory {
    pub use polystore_memory::MemoryAdapter;
}

/// Relational (MySQL) storage adapter.
///
/// This module is only available when the `sql` feature is enabled.
#[cfg(feature = "sql")]
pub mod sql {
    pub use polystore_sql::{SqlAdapter, SqlConfig};
}

/// MongoDB storage adapter.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use polystore_mongodb::{MongoAdapter, MongoConfig};
}

/// Firestore storage adapter.
///
/// This module is only available when the `firestore` feature is enabled.
#[cfg(feature = "firestore")]
pub mod firestore {
    pub use polystore_firestore::{FirestoreAdapter, FirestoreConfig};
}

/// HTTP API storage adapter.
///
/// This module is only available when the `http` feature is enabled.
#[cfg(feature = "http")]
pub mod http {
    pub use polystore_http::{BodyKind, HttpAdapter, HttpConfig, UpdateMethod};
}
