//! MongoDB storage adapter for polystore.
//!
//! Translates the shared query vocabulary into native MongoDB filter
//! documents and maps between JSON documents and BSON, renaming the `_id`
//! primary key to `id` on the way out. Conditional updates and deletes use
//! the driver's `update_many`/`delete_many` primitives directly.

pub mod adapter;
pub mod filter;

pub use adapter::{MongoAdapter, MongoConfig};
