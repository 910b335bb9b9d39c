//! The Firestore adapter, speaking the REST API.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Response;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use polystore_core::{
    adapter::DataAdapter,
    connection::{ConnectionDescriptor, ConnectionType},
    document::Document,
    error::{DataError, DataResult},
    query::{QueryOptions, Sort},
};

use crate::query::{build_prefix_query, build_query};
use crate::value::{decode_document, encode_fields};

// One shared HTTP client; reqwest clients pool connections internally.
static HTTP: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Connection settings for a Firestore project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: String,
}

/// Adapter for Google Cloud Firestore.
///
/// Reads run through `documents:runQuery` with a structured query; writes use
/// the per-document REST endpoints. Firestore queries cannot skip results, so
/// an offset is emulated: a prefix query fetches the first `offset` matches
/// (same filters and order) and the real query resumes after the last of
/// them via a cursor. Without a sort the offset has no stable meaning and is
/// ignored with a warning.
#[derive(Debug, Clone)]
pub struct FirestoreAdapter {
    config: FirestoreConfig,
}

impl FirestoreAdapter {
    pub fn new(config: FirestoreConfig) -> Self {
        Self { config }
    }

    /// Builds an adapter from a registered connection descriptor.
    pub fn from_descriptor(descriptor: &ConnectionDescriptor) -> DataResult<Self> {
        descriptor.expect_type(ConnectionType::Firestore)?;
        let config: FirestoreConfig =
            serde_json::from_value(Value::Object(descriptor.key.clone())).map_err(|e| {
                DataError::Configuration(format!(
                    "invalid credentials for Firestore connection '{}': {e}",
                    descriptor.name
                ))
            })?;
        Ok(Self::new(config))
    }

    fn documents_url(&self) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            self.config.project_id
        )
    }

    fn run_query_url(&self) -> String {
        format!("{}:runQuery?key={}", self.documents_url(), self.config.api_key)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{collection}?key={}",
            self.documents_url(),
            self.config.api_key
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{collection}/{id}?key={}",
            self.documents_url(),
            self.config.api_key
        )
    }

    async fn check(response: Response) -> DataResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(DataError::Backend(format!(
            "firestore request failed with {status}: {body}"
        )))
    }

    /// Runs a structured query and returns the raw document resources.
    async fn run_query(&self, structured: &Value) -> DataResult<Vec<Value>> {
        debug!(query = %structured, "running structured query");
        let response = HTTP
            .post(self.run_query_url())
            .json(&json!({ "structuredQuery": structured }))
            .send()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        let body: Value = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;

        // The response is a stream of entries; only some carry a document.
        Ok(body
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("document").cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Decides whether a requested offset gets the prefix-query emulation.
///
/// Emulation needs a sort: the cursor resumes on the sort value, and an
/// unordered result set gives the offset no stable meaning. Offsets without a
/// sort are ignored with a warning.
fn offset_to_emulate(options: &QueryOptions) -> Option<(u64, &Sort)> {
    let offset = options.offset.filter(|o| *o > 0)?;
    match &options.sort_by {
        Some(sort) => Some((offset, sort)),
        None => {
            warn!(
                collection = %options.collection_name,
                "offset requires a sort on this backend, ignoring"
            );
            None
        }
    }
}

/// Builds the cursor that resumes a query after `resource`, matching the
/// orderBy shape of [`build_query`] (sort field, then `__name__`).
fn cursor_after(resource: &Value, sort_field: &str) -> Value {
    let sort_value = resource["fields"]
        .get(sort_field)
        .cloned()
        .unwrap_or(json!({ "nullValue": null }));
    json!({
        "values": [sort_value, { "referenceValue": resource["name"] }],
        "before": false,
    })
}

#[async_trait]
impl DataAdapter for FirestoreAdapter {
    async fn get_documents(&self, options: &QueryOptions) -> DataResult<Vec<Document>> {
        let mut start_at = None;
        if let Some((offset, sort)) = offset_to_emulate(options) {
            let skipped = self.run_query(&build_prefix_query(options, offset)?).await?;
            if (skipped.len() as u64) < offset {
                return Ok(vec![]);
            }
            match skipped.last() {
                Some(last) => start_at = Some(cursor_after(last, &sort.field)),
                None => return Ok(vec![]),
            }
        }

        let resources = self.run_query(&build_query(options, start_at)?).await?;
        Ok(resources.iter().map(decode_document).collect())
    }

    async fn add_document(&self, collection: &str, data: Document) -> DataResult<String> {
        let response = HTTP
            .post(self.collection_url(collection))
            .json(&json!({ "fields": encode_fields(&data) }))
            .send()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        let body: Value = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;

        body.get("name")
            .and_then(Value::as_str)
            .and_then(|name| name.rsplit('/').next())
            .map(String::from)
            .ok_or_else(|| {
                DataError::Backend("create response carried no document name".to_string())
            })
    }

    async fn update_document(&self, collection: &str, id: &str, data: Document) -> DataResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        // The update mask restricts the patch to the supplied fields; without
        // it Firestore would drop every other field of the document.
        let mut url = self.document_url(collection, id);
        for field in data.keys() {
            url.push_str("&updateMask.fieldPaths=");
            url.push_str(field);
        }

        let response = HTTP
            .patch(url)
            .json(&json!({ "fields": encode_fields(&data) }))
            .send()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> DataResult<()> {
        let response = HTTP
            .delete(self.document_url(collection, id))
            .send()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::connection::CredentialMap;
    use polystore_core::query::SortDirection;

    fn adapter() -> FirestoreAdapter {
        FirestoreAdapter::new(FirestoreConfig {
            project_id: "demo".into(),
            api_key: "k1".into(),
        })
    }

    fn credentials(value: Value) -> CredentialMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn descriptor_credentials_are_camel_case() {
        let descriptor = ConnectionDescriptor::new(
            "fs",
            ConnectionType::Firestore,
            credentials(json!({"projectId": "demo", "apiKey": "k1"})),
        );
        let adapter = FirestoreAdapter::from_descriptor(&descriptor).unwrap();
        assert_eq!(adapter.config.project_id, "demo");

        let wrong = ConnectionDescriptor::new(
            "fs",
            ConnectionType::HttpApi,
            credentials(json!({"projectId": "demo", "apiKey": "k1"})),
        );
        assert!(matches!(
            FirestoreAdapter::from_descriptor(&wrong).unwrap_err(),
            DataError::Configuration(_)
        ));
    }

    #[test]
    fn urls_address_the_default_database() {
        let adapter = adapter();
        assert_eq!(
            adapter.run_query_url(),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents:runQuery?key=k1"
        );
        assert_eq!(
            adapter.document_url("users", "abc"),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents/users/abc?key=k1"
        );
    }

    #[test]
    fn offset_without_a_sort_is_ignored() {
        let mut options = QueryOptions::new("users");
        options.offset = Some(3);

        assert!(offset_to_emulate(&options).is_none());
        // The plain query carries no cursor either.
        let query = build_query(&options, None).unwrap();
        assert!(query.get("startAt").is_none());

        options.sort_by = Some(Sort::new("age", SortDirection::Asc));
        let (offset, sort) = offset_to_emulate(&options).unwrap();
        assert_eq!(offset, 3);
        assert_eq!(sort.field, "age");

        // A zero offset skips nothing and needs no emulation.
        options.offset = Some(0);
        assert!(offset_to_emulate(&options).is_none());
    }

    #[test]
    fn cursor_resumes_after_the_last_skipped_document() {
        let resource = json!({
            "name": "projects/demo/databases/(default)/documents/users/abc",
            "fields": { "age": { "integerValue": "36" } }
        });

        let cursor = cursor_after(&resource, "age");
        assert_eq!(
            cursor,
            json!({
                "values": [
                    { "integerValue": "36" },
                    { "referenceValue": "projects/demo/databases/(default)/documents/users/abc" },
                ],
                "before": false,
            })
        );

        // A document without the sort field positions on null.
        let cursor = cursor_after(&resource, "missing");
        assert_eq!(cursor["values"][0], json!({ "nullValue": null }));
    }
}
