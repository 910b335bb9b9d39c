//! Named connection descriptors and the registry that owns them.
//!
//! A connection is a named, typed binding to one backend store plus its
//! credentials. The registry stores descriptors and a side table of attached
//! [`DataAdapter`]s keyed by connection name. Registries are plain values
//! with no interior locking; callers own one per process or per request and
//! pass it explicitly (no hidden global state).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use crate::{
    adapter::DataAdapter,
    error::{DataError, DataResult},
};

/// The backend family a connection points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionType {
    /// A relational SQL database.
    #[serde(rename = "relational")]
    Relational,
    /// A Firestore project.
    #[serde(rename = "document-firestore")]
    Firestore,
    /// A MongoDB deployment.
    #[serde(rename = "document-mongo")]
    MongoDb,
    /// A generic HTTP API.
    #[serde(rename = "http-api")]
    HttpApi,
}

/// Opaque, backend-specific credential map carried by a descriptor.
pub type CredentialMap = serde_json::Map<String, Value>;

/// A named, typed binding to one backend store.
///
/// The name is immutable once registered; re-registering the same name fails
/// with [`DataError::DuplicateName`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ConnectionType,
    /// Backend-specific credentials, e.g. host/port/user/password/database
    /// for a relational connection or basePath/bearerToken for an HTTP API.
    pub key: CredentialMap,
}

impl ConnectionDescriptor {
    pub fn new(name: impl Into<String>, kind: ConnectionType, key: CredentialMap) -> Self {
        Self { name: name.into(), kind, key }
    }

    /// Fails with [`DataError::Configuration`] unless the descriptor is of
    /// the expected connection type. Adapter constructors call this before
    /// reading credentials.
    pub fn expect_type(&self, kind: ConnectionType) -> DataResult<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(DataError::Configuration(format!(
                "connection '{}' is of type {:?}, expected {:?}",
                self.name, self.kind, kind
            )))
        }
    }

    /// Reads a credential entry as a string slice, if present.
    pub fn key_str(&self, name: &str) -> Option<&str> {
        self.key.get(name).and_then(Value::as_str)
    }
}

/// Registry of connection descriptors and their attached adapters.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    descriptors: HashMap<String, ConnectionDescriptor>,
    /// Registration order, for `list()`.
    order: Vec<String>,
    adapters: HashMap<String, Arc<dyn DataAdapter>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a descriptor under its name.
    ///
    /// Fails with [`DataError::DuplicateName`] when the name is taken; names
    /// are immutable once registered.
    pub fn register(&mut self, descriptor: ConnectionDescriptor) -> DataResult<()> {
        if self.descriptors.contains_key(&descriptor.name) {
            return Err(DataError::DuplicateName(descriptor.name));
        }
        debug!(connection = %descriptor.name, kind = ?descriptor.kind, "registered connection");
        self.order.push(descriptor.name.clone());
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Associates an adapter with a registered connection, replacing any
    /// prior one for that name (last write wins).
    ///
    /// Fails with [`DataError::UnknownConnection`] when the connection was
    /// never registered.
    pub fn attach_adapter(&mut self, name: &str, adapter: Arc<dyn DataAdapter>) -> DataResult<()> {
        if !self.descriptors.contains_key(name) {
            return Err(DataError::UnknownConnection(name.to_string()));
        }
        if self.adapters.insert(name.to_string(), adapter).is_some() {
            debug!(connection = name, "replaced previously attached adapter");
        }
        Ok(())
    }

    /// Looks up a descriptor by name. An absent name is an empty result, not
    /// a fault.
    pub fn get(&self, name: &str) -> Option<&ConnectionDescriptor> {
        self.descriptors.get(name)
    }

    /// Looks up the adapter attached to a connection. Absence is not an
    /// error at this layer; callers surface it as
    /// [`DataError::NoAdapterAttached`] when a query actually needs one.
    pub fn get_adapter(&self, name: &str) -> Option<Arc<dyn DataAdapter>> {
        self.adapters.get(name).cloned()
    }

    /// All registered descriptors in insertion order. The iterator is lazy,
    /// finite and restartable (each call starts fresh).
    pub fn list(&self) -> impl Iterator<Item = &ConnectionDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.descriptors.get(name))
    }
}
