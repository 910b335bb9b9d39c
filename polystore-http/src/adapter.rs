//! The generic HTTP API adapter.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use polystore_core::{
    adapter::DataAdapter,
    connection::{ConnectionDescriptor, ConnectionType},
    document::Document,
    error::{DataError, DataResult},
    query::QueryOptions,
};

use crate::url::{build_get_url, collection_url, document_url, render_value};

// One shared HTTP client; reqwest clients pool connections internally.
static HTTP: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// How write payloads are encoded on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    #[default]
    Json,
    /// multipart/form-data with one text part per field.
    Form,
    /// application/x-www-form-urlencoded.
    Urlencoded,
}

/// The verb used for updates; REST APIs are split on this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    #[default]
    Put,
    Patch,
}

/// Connection settings for a REST-style HTTP API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    pub base_path: String,
    /// Bearer token, stored with or without the `Bearer ` prefix.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body_kind: BodyKind,
    #[serde(default)]
    pub update_method: UpdateMethod,
}

/// Adapter for REST-style HTTP APIs following the
/// `GET /collection`, `POST /collection`, `PUT|PATCH /collection/{id}`,
/// `DELETE /collection/{id}` layout.
///
/// Filtering beyond equality, sorting and paging depend on the remote API
/// honoring the `_sort`/`_order`/`_limit`/`_page` conventions; the field
/// projection is applied client-side after the response arrives.
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    config: HttpConfig,
}

impl HttpAdapter {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Builds an adapter from a registered connection descriptor.
    pub fn from_descriptor(descriptor: &ConnectionDescriptor) -> DataResult<Self> {
        descriptor.expect_type(ConnectionType::HttpApi)?;
        let config: HttpConfig =
            serde_json::from_value(Value::Object(descriptor.key.clone())).map_err(|e| {
                DataError::Configuration(format!(
                    "invalid credentials for HTTP connection '{}': {e}",
                    descriptor.name
                ))
            })?;
        Ok(Self::new(config))
    }

    fn bearer_header(&self) -> Option<String> {
        let token = self.config.bearer_token.as_deref()?.trim();
        if token.is_empty() {
            return None;
        }
        if token.starts_with("Bearer ") {
            Some(token.to_string())
        } else {
            Some(format!("Bearer {token}"))
        }
    }

    fn apply_headers(&self, mut request: RequestBuilder) -> RequestBuilder {
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }
        if let Some(authorization) = self.bearer_header() {
            request = request.header("Authorization", authorization);
        }
        request
    }

    fn with_body(&self, request: RequestBuilder, data: &Document) -> RequestBuilder {
        match self.config.body_kind {
            BodyKind::Json => request.json(data),
            BodyKind::Urlencoded => request.form(&flatten(data)),
            BodyKind::Form => {
                let mut form = reqwest::multipart::Form::new();
                for (key, value) in data {
                    form = form.text(key.clone(), render_value(value));
                }
                request.multipart(form)
            }
        }
    }

    async fn check(response: Response) -> DataResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(DataError::Backend(format!(
            "http request failed with {status}: {body}"
        )))
    }

    async fn json_body(response: Response) -> DataResult<Value> {
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))
    }
}

fn flatten(data: &Document) -> HashMap<String, String> {
    data.iter()
        .map(|(key, value)| (key.clone(), render_value(value)))
        .collect()
}

/// Normalizes a response body into a document list: an array keeps its
/// objects, a lone object becomes a one-element list.
fn documents_from(body: Value) -> DataResult<Vec<Document>> {
    match body {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        Value::Object(map) => Ok(vec![map]),
        other => Err(DataError::Backend(format!(
            "expected an object or array response, got {other}"
        ))),
    }
}

fn project(mut document: Document, fields: &[String]) -> Document {
    if fields.is_empty() {
        return document;
    }
    // The id always survives projection so mutations can target the result.
    document.retain(|key, _| key == "id" || fields.iter().any(|f| f == key));
    document
}

#[async_trait]
impl DataAdapter for HttpAdapter {
    async fn get_documents(&self, options: &QueryOptions) -> DataResult<Vec<Document>> {
        let url = build_get_url(&self.config.base_path, options)?;
        debug!(%url, "fetching collection");

        let response = self
            .apply_headers(HTTP.get(url))
            .send()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        let body = Self::json_body(response).await?;

        Ok(documents_from(body)?
            .into_iter()
            .map(|doc| project(doc, &options.fields))
            .collect())
    }

    async fn add_document(&self, collection: &str, data: Document) -> DataResult<String> {
        let url = collection_url(&self.config.base_path, collection)?;
        let request = self.apply_headers(HTTP.post(url));
        let response = self
            .with_body(request, &data)
            .send()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        let body = Self::json_body(response).await?;

        match body.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(DataError::Backend(
                "create response carried no id".to_string(),
            )),
        }
    }

    async fn update_document(&self, collection: &str, id: &str, data: Document) -> DataResult<()> {
        let url = document_url(&self.config.base_path, collection, id)?;
        let request = match self.config.update_method {
            UpdateMethod::Put => HTTP.put(url),
            UpdateMethod::Patch => HTTP.patch(url),
        };
        let response = self
            .with_body(self.apply_headers(request), &data)
            .send()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> DataResult<()> {
        let url = document_url(&self.config.base_path, collection, id)?;
        let response = self
            .apply_headers(HTTP.delete(url))
            .send()
            .await
            .map_err(|e| DataError::Backend(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }
}
