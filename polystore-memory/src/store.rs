//! The in-memory adapter.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

use polystore_core::{
    adapter::DataAdapter,
    document::{Document, document_id},
    error::{DataError, DataResult},
    query::{Filter, QueryOptions, SortDirection},
};

use crate::evaluator::{compare_field, matches_filter};

#[derive(Debug, Default)]
struct CollectionState {
    /// Documents in insertion order; each carries its `id` field.
    documents: Vec<Document>,
    next_id: u64,
}

type StoreMap = HashMap<String, CollectionState>;

/// Thread-safe in-memory storage adapter.
///
/// Documents live in per-collection vectors behind an async read-write lock;
/// ids are sequential integers rendered as strings. Queries scan the whole
/// collection (no indexing), which is fine for tests and small datasets.
///
/// The adapter is cheap to clone; clones share the same underlying data.
#[derive(Debug, Default, Clone)]
pub struct MemoryAdapter {
    store: Arc<RwLock<StoreMap>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interprets a raw filter as a JSON object of field-to-value equality
    /// constraints, e.g. `{"name": "Ada", "active": true}`.
    fn parse_raw_filter(raw: &str) -> DataResult<Vec<Filter>> {
        let value: Value = serde_json::from_str(raw).map_err(|e| {
            DataError::Configuration(format!("raw filter is not valid JSON: {e}"))
        })?;
        let Value::Object(map) = value else {
            return Err(DataError::Configuration(
                "raw filter for the memory adapter must be a JSON object of equality constraints"
                    .to_string(),
            ));
        };
        Ok(map.into_iter().map(|(k, v)| Filter::eq(k, v)).collect())
    }

    fn project(mut document: Document, fields: &[String]) -> Document {
        if fields.is_empty() {
            return document;
        }
        // The id always survives projection so mutations can target the result.
        document.retain(|key, _| key == "id" || fields.iter().any(|f| f == key));
        document
    }
}

#[async_trait]
impl DataAdapter for MemoryAdapter {
    async fn get_documents(&self, options: &QueryOptions) -> DataResult<Vec<Document>> {
        let filters = match &options.raw_where {
            Some(raw) => Self::parse_raw_filter(raw)?,
            None => options.filters.clone(),
        };

        let store = self.store.read().await;
        let Some(collection) = store.get(&options.collection_name) else {
            return Ok(vec![]);
        };

        let mut matches: Vec<Document> = collection
            .documents
            .iter()
            .filter(|doc| filters.iter().all(|f| matches_filter(doc, f)))
            .cloned()
            .collect();

        if let Some(sort) = &options.sort_by {
            matches.sort_by(|a, b| {
                let ordering = compare_field(a, b, &sort.field);
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        Ok(matches
            .into_iter()
            .skip(options.offset.unwrap_or(0) as usize)
            .take(options.limit.map_or(usize::MAX, |l| l as usize))
            .map(|doc| Self::project(doc, &options.fields))
            .collect())
    }

    async fn add_document(&self, collection: &str, mut data: Document) -> DataResult<String> {
        let mut store = self.store.write().await;
        let state = store.entry(collection.to_string()).or_default();

        state.next_id += 1;
        let id = state.next_id.to_string();
        data.insert("id".to_string(), Value::String(id.clone()));
        state.documents.push(data);
        Ok(id)
    }

    async fn update_document(&self, collection: &str, id: &str, data: Document) -> DataResult<()> {
        let mut store = self.store.write().await;
        let Some(state) = store.get_mut(collection) else {
            return Ok(());
        };
        // Updating an absent id is a no-op, like the persistent backends.
        if let Some(doc) = state
            .documents
            .iter_mut()
            .find(|doc| document_id(doc).as_deref() == Some(id))
        {
            for (key, value) in data {
                doc.insert(key, value);
            }
            doc.insert("id".to_string(), Value::String(id.to_string()));
        }
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> DataResult<()> {
        let mut store = self.store.write().await;
        if let Some(state) = store.get_mut(collection) {
            state
                .documents
                .retain(|doc| document_id(doc).as_deref() != Some(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::{
        connection::{ConnectionType, CredentialMap},
        mapper::Mapper,
        query::SortDirection,
    };
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    async fn seeded_mapper() -> Mapper {
        let mut mapper = Mapper::new();
        mapper
            .connect("mem", ConnectionType::Relational, CredentialMap::new())
            .unwrap();
        mapper.attach("mem", Arc::new(MemoryAdapter::new())).unwrap();
        mapper
            .schema("users")
            .unwrap()
            .bind("mem", "users")
            .structure([
                ("id", "int auto_increment"),
                ("name", "string editable"),
                ("age", "number editable"),
            ])
            .unwrap();

        for (name, age) in [("Ada", 36), ("Grace", 85), ("Edsger", 72)] {
            mapper
                .add("users", doc(json!({"name": name, "age": age})))
                .await
                .unwrap();
        }
        mapper
    }

    #[tokio::test]
    async fn added_document_round_trips_through_its_id() {
        let mapper = seeded_mapper().await;

        let id = mapper
            .add("users", doc(json!({"name": "Barbara", "age": 88})))
            .await
            .unwrap();
        let found = mapper
            .get_one("users", &[("id", json!(id))])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["name"], json!("Barbara"));
    }

    #[tokio::test]
    async fn add_drops_fields_the_schema_does_not_declare() {
        let mapper = seeded_mapper().await;

        let id = mapper
            .add("users", doc(json!({"name": "Ada", "extra": "dropped"})))
            .await
            .unwrap();
        let found = mapper
            .get_one("users", &[("id", json!(id))])
            .await
            .unwrap()
            .unwrap();
        assert!(!found.contains_key("extra"));
    }

    #[tokio::test]
    async fn unknown_operator_behaves_like_equality() {
        let mapper = seeded_mapper().await;

        let exact = mapper
            .query("users")
            .unwrap()
            .filter_op("name", "=", json!("Ada"))
            .get()
            .await
            .unwrap();
        let lenient = mapper
            .query("users")
            .unwrap()
            .filter_op("name", "~=", json!("Ada"))
            .get()
            .await
            .unwrap();
        assert_eq!(exact, lenient);
        assert_eq!(exact.len(), 1);
    }

    #[tokio::test]
    async fn sort_offset_and_limit_page_through_results() {
        let mapper = seeded_mapper().await;

        let page = mapper
            .query("users")
            .unwrap()
            .sort_by("age", SortDirection::Desc)
            .offset(1)
            .limit(1)
            .get()
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["name"], json!("Edsger"));
    }

    #[tokio::test]
    async fn comparison_filters_apply() {
        let mapper = seeded_mapper().await;

        let seniors = mapper
            .query("users")
            .unwrap()
            .filter_op("age", ">=", json!(72))
            .get()
            .await
            .unwrap();
        assert_eq!(seniors.len(), 2);
    }

    #[tokio::test]
    async fn projection_keeps_id_alongside_selected_fields() {
        let mapper = seeded_mapper().await;

        let rows = mapper
            .query("users")
            .unwrap()
            .select(["name"])
            .get()
            .await
            .unwrap();
        for row in rows {
            assert!(row.contains_key("name"));
            assert!(row.contains_key("id"));
            assert!(!row.contains_key("age"));
        }
    }

    #[tokio::test]
    async fn raw_filter_is_an_equality_object() {
        let mapper = seeded_mapper().await;

        let rows = mapper
            .query("users")
            .unwrap()
            .raw_filter(r#"{"name": "Grace"}"#)
            .get()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["age"], json!(85));

        let err = mapper
            .query("users")
            .unwrap()
            .raw_filter("name = 'Grace'")
            .get()
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Configuration(_)));
    }

    #[tokio::test]
    async fn bulk_update_rewrites_every_match() {
        let mapper = seeded_mapper().await;

        mapper
            .query("users")
            .unwrap()
            .filter_op("age", ">", json!(40))
            .set(doc(json!({"age": 0})))
            .update()
            .await
            .unwrap();

        let reset = mapper.get("users", &[("age", json!(0))]).await.unwrap();
        assert_eq!(reset.len(), 2);
        // Untouched document keeps its value.
        let ada = mapper
            .get_one("users", &[("name", json!("Ada"))])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ada["age"], json!(36));
    }

    #[tokio::test]
    async fn one_variants_are_noops_when_nothing_matches() {
        let mapper = seeded_mapper().await;

        mapper
            .query("users")
            .unwrap()
            .filter("name", json!("Nobody"))
            .delete_one()
            .await
            .unwrap();
        mapper
            .query("users")
            .unwrap()
            .filter("name", json!("Nobody"))
            .set(doc(json!({"age": 1})))
            .update_one()
            .await
            .unwrap();

        assert_eq!(mapper.get("users", &[]).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_removes_only_matches() {
        let mapper = seeded_mapper().await;

        mapper
            .delete("users", &[("name", json!("Grace"))])
            .await
            .unwrap();

        let remaining = mapper.get("users", &[]).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|d| d["name"] != json!("Grace")));
    }

    #[tokio::test]
    async fn querying_an_empty_collection_returns_nothing() {
        let mut mapper = Mapper::new();
        mapper
            .connect("mem", ConnectionType::Relational, CredentialMap::new())
            .unwrap();
        mapper.attach("mem", Arc::new(MemoryAdapter::new())).unwrap();
        mapper
            .schema("empty")
            .unwrap()
            .bind("mem", "empty")
            .structure([("name", "string")])
            .unwrap();

        assert!(mapper.get("empty", &[]).await.unwrap().is_empty());
        assert!(mapper.get_one("empty", &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clones_share_the_same_data() {
        let adapter = MemoryAdapter::new();
        let clone = adapter.clone();

        adapter
            .add_document("things", doc(json!({"name": "shared"})))
            .await
            .unwrap();
        let rows = clone
            .get_documents(&QueryOptions::new("things"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
