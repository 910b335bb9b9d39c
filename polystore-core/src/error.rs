//! Error types and result types for data access operations.
//!
//! This module provides the error taxonomy for every layer of polystore.
//! Use [`DataResult<T>`] as the return type for fallible operations.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur in the data access layer.
///
/// Registry and builder misuse is reported through the dedicated variants;
/// failures from the underlying drivers and HTTP clients are passed through
/// as [`Backend`](DataError::Backend) without reinterpretation.
#[derive(Error, Debug)]
pub enum DataError {
    /// A connection or schema with this name is already registered.
    #[error("Name already registered: {0}")]
    DuplicateName(String),
    /// The referenced connection name was never registered.
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),
    /// The referenced schema name was never registered.
    #[error("Unknown schema: {0}")]
    UnknownSchema(String),
    /// A schema structure was supplied before its connection/collection binding.
    #[error("Schema '{0}' has no connection/collection binding; call bind() before structure()")]
    IncompleteSchema(String),
    /// A query was issued against a connection with no backend adapter attached.
    #[error("No adapter attached for connection '{0}'")]
    NoAdapterAttached(String),
    /// `update()`/`update_one()` was called without a prior update payload.
    #[error("No update payload set; call set() before update()")]
    MissingUpdatePayload,
    /// A bulk mutation hit a document that carries no `id` key.
    #[error("Document in collection '{0}' is missing an 'id' field")]
    MissingDocumentId(String),
    /// A connection descriptor is missing or carries unusable credentials.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// Serialization/deserialization error when converting document values.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error reported by the underlying storage backend or HTTP endpoint.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for data access operations.
pub type DataResult<T> = Result<T, DataError>;

impl From<SerdeJsonError> for DataError {
    fn from(err: SerdeJsonError) -> Self {
        DataError::Serialization(err.to_string())
    }
}
