//! In-memory storage adapter for polystore.
//!
//! A thread-safe, non-persistent [`DataAdapter`](polystore_core::adapter::DataAdapter)
//! backed by async-aware read-write locks. Useful for tests, prototyping and
//! small datasets; every query scans its collection.
//!
//! Ids are sequential integers rendered as strings, so a freshly added
//! document can immediately be re-fetched by filtering on `id`.

pub mod evaluator;
pub mod store;

pub use store::MemoryAdapter;
