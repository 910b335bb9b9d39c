//! The top-level entry point tying connections, schemas and queries together.
//!
//! A [`Mapper`] owns one [`ConnectionRegistry`] and one [`SchemaRegistry`]
//! and hands out per-invocation [`SchemaQuery`] builders. It is a plain value
//! with no interior locking; wrap it yourself if you need shared mutation.

use serde_json::Value;
use std::sync::Arc;

use crate::{
    adapter::DataAdapter,
    builder::SchemaQuery,
    connection::{ConnectionDescriptor, ConnectionRegistry, ConnectionType, CredentialMap},
    document::Document,
    error::{DataError, DataResult},
    schema::{SchemaBuilder, SchemaRegistry},
};

/// Facade over the connection and schema registries.
#[derive(Debug, Default)]
pub struct Mapper {
    connections: ConnectionRegistry,
    schemas: SchemaRegistry,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named connection of the given backend family.
    pub fn connect(
        &mut self,
        name: impl Into<String>,
        kind: ConnectionType,
        key: CredentialMap,
    ) -> DataResult<()> {
        self.connections
            .register(ConnectionDescriptor::new(name, kind, key))
    }

    /// Attaches a concrete adapter to a registered connection.
    pub fn attach(&mut self, name: &str, adapter: Arc<dyn DataAdapter>) -> DataResult<()> {
        self.connections.attach_adapter(name, adapter)
    }

    /// Begins two-phase registration of a new schema.
    pub fn schema(&mut self, name: impl Into<String>) -> DataResult<SchemaBuilder<'_>> {
        self.schemas.create(name)
    }

    /// Creates a fresh single-use query against a registered schema.
    pub fn query(&self, schema: &str) -> DataResult<SchemaQuery<'_>> {
        let definition = self
            .schemas
            .get(schema)
            .ok_or_else(|| DataError::UnknownSchema(schema.to_string()))?;
        Ok(SchemaQuery::new(&self.connections, definition))
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut ConnectionRegistry {
        &mut self.connections
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn schemas_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.schemas
    }

    /// Shortcut: fetch all documents matching a set of equality filters.
    pub async fn get(&self, schema: &str, filters: &[(&str, Value)]) -> DataResult<Vec<Document>> {
        self.filtered(schema, filters)?.get().await
    }

    /// Shortcut: fetch the first document matching a set of equality filters.
    pub async fn get_one(
        &self,
        schema: &str,
        filters: &[(&str, Value)],
    ) -> DataResult<Option<Document>> {
        self.filtered(schema, filters)?.get_one().await
    }

    /// Shortcut: insert one document.
    pub async fn add(&self, schema: &str, data: Document) -> DataResult<String> {
        self.query(schema)?.add(data).await
    }

    /// Shortcut: update every document matching a set of equality filters.
    pub async fn update(
        &self,
        schema: &str,
        filters: &[(&str, Value)],
        data: Document,
    ) -> DataResult<()> {
        self.filtered(schema, filters)?.set(data).update().await
    }

    /// Shortcut: delete every document matching a set of equality filters.
    pub async fn delete(&self, schema: &str, filters: &[(&str, Value)]) -> DataResult<()> {
        self.filtered(schema, filters)?.delete().await
    }

    fn filtered(&self, schema: &str, filters: &[(&str, Value)]) -> DataResult<SchemaQuery<'_>> {
        let mut query = self.query(schema)?;
        for (field, value) in filters {
            query = query.filter(*field, value.clone());
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryOptions;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct EchoAdapter {
        seen_options: Mutex<Vec<QueryOptions>>,
    }

    #[async_trait]
    impl DataAdapter for EchoAdapter {
        async fn get_documents(&self, options: &QueryOptions) -> DataResult<Vec<Document>> {
            self.seen_options.lock().unwrap().push(options.clone());
            Ok(vec![])
        }
        async fn add_document(&self, _collection: &str, _data: Document) -> DataResult<String> {
            Ok("1".into())
        }
        async fn update_document(&self, _c: &str, _id: &str, _data: Document) -> DataResult<()> {
            Ok(())
        }
        async fn delete_document(&self, _c: &str, _id: &str) -> DataResult<()> {
            Ok(())
        }
    }

    fn mapper_with(adapter: Arc<EchoAdapter>) -> Mapper {
        let mut mapper = Mapper::new();
        mapper
            .connect("c1", ConnectionType::Relational, CredentialMap::new())
            .unwrap();
        mapper.attach("c1", adapter).unwrap();
        mapper
            .schema("users")
            .unwrap()
            .bind("c1", "users")
            .structure([("id", "int auto_increment"), ("name", "string editable")])
            .unwrap();
        mapper
    }

    #[tokio::test]
    async fn query_against_unknown_schema_fails() {
        let mapper = Mapper::new();
        let err = mapper.query("ghosts").unwrap_err();
        assert!(matches!(err, DataError::UnknownSchema(n) if n == "ghosts"));
    }

    #[tokio::test]
    async fn shortcut_get_builds_equality_filters() {
        let adapter = Arc::new(EchoAdapter::default());
        let mapper = mapper_with(adapter.clone());

        mapper
            .get("users", &[("name", json!("Ada")), ("id", json!(3))])
            .await
            .unwrap();

        let seen = adapter.seen_options.lock().unwrap();
        let options = &seen[0];
        assert_eq!(options.collection_name, "users");
        assert_eq!(options.filters.len(), 2);
        assert_eq!(options.filters[0].operator, "=");
        assert_eq!(options.filters[1].value, json!(3));
    }

    #[tokio::test]
    async fn shortcut_get_one_caps_the_query() {
        let adapter = Arc::new(EchoAdapter::default());
        let mapper = mapper_with(adapter.clone());

        let result = mapper.get_one("users", &[("id", json!(1))]).await.unwrap();
        assert!(result.is_none());

        let seen = adapter.seen_options.lock().unwrap();
        assert_eq!(seen[0].limit, Some(1));
    }

    #[tokio::test]
    async fn connect_rejects_duplicate_connection_names() {
        let mut mapper = Mapper::new();
        mapper
            .connect("c1", ConnectionType::HttpApi, CredentialMap::new())
            .unwrap();
        let err = mapper
            .connect("c1", ConnectionType::MongoDb, CredentialMap::new())
            .unwrap_err();
        assert!(matches!(err, DataError::DuplicateName(n) if n == "c1"));
    }
}
