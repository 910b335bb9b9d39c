//! Convenient re-exports of commonly used types from polystore.
//!
//! Import this prelude module to quickly access the most frequently used
//! types without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use polystore::prelude::*;
//! ```

pub use polystore_core::{
    adapter::DataAdapter,
    builder::SchemaQuery,
    connection::{ConnectionDescriptor, ConnectionRegistry, ConnectionType, CredentialMap},
    document::{Document, document_id},
    error::{DataError, DataResult},
    mapper::Mapper,
    query::{Filter, FilterOp, QueryOptions, Sort, SortDirection},
    schema::{Field, FieldType, SchemaBuilder, SchemaDefinition, SchemaRegistry, Structure},
};
