//! The MongoDB adapter.

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{Client, Collection, options::FindOptions};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use polystore_core::{
    adapter::DataAdapter,
    connection::{ConnectionDescriptor, ConnectionType},
    document::Document,
    error::{DataError, DataResult},
    query::{QueryOptions, SortDirection},
};

use crate::filter::{build_filter, json_to_bson};

/// Connection settings for a MongoDB backend.
#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    /// Database name; when absent it is taken from the URI path.
    #[serde(default)]
    pub database: Option<String>,
}

/// Adapter for MongoDB deployments.
///
/// Creates one short-lived client per operation and shuts it down after the
/// results are collected, so the adapter itself holds no connection state.
#[derive(Debug, Clone)]
pub struct MongoAdapter {
    config: MongoConfig,
    database: String,
}

impl MongoAdapter {
    pub fn new(config: MongoConfig) -> DataResult<Self> {
        let database = config
            .database
            .clone()
            .or_else(|| database_from_uri(&config.uri))
            .ok_or_else(|| {
                DataError::Configuration(
                    "no database name given and none present in the MongoDB URI".to_string(),
                )
            })?;
        Ok(Self { config, database })
    }

    /// Builds an adapter from a registered connection descriptor.
    pub fn from_descriptor(descriptor: &ConnectionDescriptor) -> DataResult<Self> {
        descriptor.expect_type(ConnectionType::MongoDb)?;
        let config: MongoConfig =
            serde_json::from_value(Value::Object(descriptor.key.clone())).map_err(|e| {
                DataError::Configuration(format!(
                    "invalid credentials for MongoDB connection '{}': {e}",
                    descriptor.name
                ))
            })?;
        Self::new(config)
    }

    async fn client(&self) -> DataResult<Client> {
        Client::with_uri_str(&self.config.uri)
            .await
            .map_err(|e| DataError::Backend(e.to_string()))
    }

    fn collection(&self, client: &Client, name: &str) -> Collection<BsonDocument> {
        client.database(&self.database).collection(name)
    }
}

/// Extracts the database name from a MongoDB connection URI path.
fn database_from_uri(uri: &str) -> Option<String> {
    let rest = uri
        .strip_prefix("mongodb://")
        .or_else(|| uri.strip_prefix("mongodb+srv://"))?;
    let path = rest.split_once('/')?.1;
    let name = path.split('?').next().unwrap_or("");
    (!name.is_empty()).then(|| name.to_string())
}

/// Renders a document id for callers. ObjectIds become their hex form so the
/// id round-trips through [`parse_id`].
fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Restores an id string into its BSON form, preferring ObjectId.
fn parse_id(id: &str) -> Bson {
    ObjectId::parse_str(id)
        .map(Bson::ObjectId)
        .unwrap_or_else(|_| Bson::String(id.to_string()))
}

fn prepare_document(data: &Document) -> BsonDocument {
    data.iter()
        .map(|(key, value)| (key.clone(), json_to_bson(value)))
        .collect()
}

/// Converts a fetched BSON document back to JSON, renaming `_id` to `id`.
fn restore_document(document: BsonDocument) -> Document {
    document
        .into_iter()
        .map(|(key, value)| {
            if key == "_id" {
                ("id".to_string(), Value::String(id_to_string(&value)))
            } else {
                (key, bson_to_json(value))
            }
        })
        .collect()
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i64::from(i)),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(f) => Value::from(f),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(document) => Value::Object(
            document
                .into_iter()
                .map(|(k, v)| (k, bson_to_json(v)))
                .collect(),
        ),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(dt.to_string()),
        other => Value::String(other.to_string()),
    }
}

fn find_options(options: &QueryOptions) -> FindOptions {
    let mut find = FindOptions::default();
    find.limit = options.limit.map(|l| l as i64);
    find.skip = options.offset;
    if let Some(sort) = &options.sort_by {
        find.sort = Some(doc! {
            sort.field.clone(): match sort.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            }
        });
    }
    if !options.fields.is_empty() {
        let mut projection = doc! { "_id": 1 };
        for field in &options.fields {
            projection.insert(field.clone(), 1);
        }
        find.projection = Some(projection);
    }
    find
}

#[async_trait]
impl DataAdapter for MongoAdapter {
    async fn get_documents(&self, options: &QueryOptions) -> DataResult<Vec<Document>> {
        let filter = build_filter(options)?;
        debug!(collection = %options.collection_name, ?filter, "running find");

        let client = self.client().await?;
        let documents = self
            .collection(&client, &options.collection_name)
            .find(filter)
            .with_options(find_options(options))
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?
            .try_collect::<Vec<BsonDocument>>()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        client.shutdown().await;

        Ok(documents.into_iter().map(restore_document).collect())
    }

    async fn add_document(&self, collection: &str, data: Document) -> DataResult<String> {
        let client = self.client().await?;
        let result = self
            .collection(&client, collection)
            .insert_one(prepare_document(&data))
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        client.shutdown().await;

        Ok(id_to_string(&result.inserted_id))
    }

    async fn update_document(&self, collection: &str, id: &str, data: Document) -> DataResult<()> {
        let client = self.client().await?;
        self.collection(&client, collection)
            .update_one(
                doc! { "_id": parse_id(id) },
                doc! { "$set": prepare_document(&data) },
            )
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        client.shutdown().await;

        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> DataResult<()> {
        let client = self.client().await?;
        self.collection(&client, collection)
            .delete_one(doc! { "_id": parse_id(id) })
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        client.shutdown().await;

        Ok(())
    }

    /// Native conditional update; no read round trip.
    async fn update_by_filter(
        &self,
        options: &QueryOptions,
        data: Document,
        limit_to_one: bool,
    ) -> DataResult<()> {
        let filter = build_filter(options)?;
        let update = doc! { "$set": prepare_document(&data) };

        let client = self.client().await?;
        let collection = self.collection(&client, &options.collection_name);
        let result = if limit_to_one {
            collection.update_one(filter, update).await
        } else {
            collection.update_many(filter, update).await
        };
        result.map_err(|e| DataError::Backend(e.to_string()))?;
        client.shutdown().await;

        Ok(())
    }

    async fn delete_by_filter(&self, options: &QueryOptions, limit_to_one: bool) -> DataResult<()> {
        let filter = build_filter(options)?;

        let client = self.client().await?;
        let collection = self.collection(&client, &options.collection_name);
        let result = if limit_to_one {
            collection.delete_one(filter).await
        } else {
            collection.delete_many(filter).await
        };
        result.map_err(|e| DataError::Backend(e.to_string()))?;
        client.shutdown().await;

        Ok(())
    }
}
