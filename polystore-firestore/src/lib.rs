//! Firestore storage adapter for polystore.
//!
//! Talks to the Firestore REST API directly: structured queries via
//! `documents:runQuery`, per-document endpoints for writes, and the typed
//! value encoding Firestore expects on the wire. Offsets are emulated with a
//! prefix query and a resume cursor, since Firestore cannot skip results
//! server-side.

pub mod adapter;
pub mod query;
pub mod value;

pub use adapter::{FirestoreAdapter, FirestoreConfig};
