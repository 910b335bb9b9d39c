//! The per-invocation schema query builder.
//!
//! [`SchemaQuery`] is created fresh by [`Mapper::query`](crate::mapper::Mapper::query)
//! for one logical query or mutation and discarded after use; it holds no
//! state beyond one call chain, so no two unrelated queries ever observe each
//! other's filter state. Chain calls consume and return the builder.
//!
//! Structured filters and a raw override are tracked side by side: setting a
//! raw filter does not clear accumulated `filter` calls and vice versa, but
//! only one of the two reaches the adapter (raw wins), so neither input is
//! silently lost mid-chain.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::{
    adapter::DataAdapter,
    connection::ConnectionRegistry,
    document::{Document, document_id},
    error::{DataError, DataResult},
    query::{Filter, QueryOptions, Sort, SortDirection},
    schema::SchemaDefinition,
};

/// A stateful, single-use query against one schema.
#[derive(Debug)]
pub struct SchemaQuery<'a> {
    connections: &'a ConnectionRegistry,
    definition: &'a SchemaDefinition,
    filters: Vec<Filter>,
    raw_where: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    sort: Option<Sort>,
    projection: Option<Vec<String>>,
    pending_update: Option<Document>,
}

impl<'a> SchemaQuery<'a> {
    pub(crate) fn new(connections: &'a ConnectionRegistry, definition: &'a SchemaDefinition) -> Self {
        Self {
            connections,
            definition,
            filters: Vec::new(),
            raw_where: None,
            limit: None,
            offset: None,
            sort: None,
            projection: None,
            pending_update: None,
        }
    }

    /// Appends an equality filter. Filters combine with logical AND.
    pub fn filter(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter_op(field, "=", value)
    }

    /// Appends a structured filter with an explicit operator token.
    pub fn filter_op(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter::new(field, operator, value));
        self
    }

    /// Sets a raw, backend-specific filter string.
    ///
    /// At translation time it takes precedence over any accumulated
    /// structured filters; the two inputs are mutually exclusive per
    /// invocation but both remain tracked on the builder.
    pub fn raw_filter(mut self, raw: impl Into<String>) -> Self {
        self.raw_where = Some(raw.into());
        self
    }

    /// Caps the number of returned documents.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` matching documents (backend permitting).
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Orders the result set by one field.
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort::new(field, direction));
        self
    }

    /// Overrides the field projection. Without this the projection defaults
    /// to the schema's declared field list.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Stores the pending update payload. Required before
    /// [`update`](Self::update) or [`update_one`](Self::update_one).
    pub fn set(mut self, update: Document) -> Self {
        self.pending_update = Some(update);
        self
    }

    /// Returns the full matching document set.
    pub async fn get(&self) -> DataResult<Vec<Document>> {
        let adapter = self.adapter()?;
        adapter.get_documents(&self.options()).await
    }

    /// Returns the first matching document, or `None` when nothing matches.
    pub async fn get_one(&self) -> DataResult<Option<Document>> {
        let adapter = self.adapter()?;
        adapter.get_one(&self.options()).await
    }

    /// Inserts a document and returns the backend-generated id.
    ///
    /// Unless the schema allows undefined fields, keys outside the declared
    /// field list are dropped before the insert.
    pub async fn add(&self, data: Document) -> DataResult<String> {
        let adapter = self.adapter()?;
        let data = self.strip_undefined_fields(data);
        adapter.add_document(&self.definition.collection_name, data).await
    }

    /// Applies the pending update payload to every matching document.
    ///
    /// Reads the matches first, then mutates each one by id, sequentially,
    /// in the order the read returned them. A document without an `id` fails
    /// with [`DataError::MissingDocumentId`]; a failure mid-loop propagates
    /// immediately and earlier mutations stay applied.
    pub async fn update(&self) -> DataResult<()> {
        let update = self.pending_update()?;
        let adapter = self.adapter()?;
        for doc in self.get().await? {
            let id = self.require_id(&doc)?;
            adapter
                .update_document(&self.definition.collection_name, &id, update.clone())
                .await?;
        }
        Ok(())
    }

    /// Applies the pending update payload to the first matching document.
    /// A query matching nothing is a silent no-op.
    pub async fn update_one(&self) -> DataResult<()> {
        let update = self.pending_update()?;
        let adapter = self.adapter()?;
        let Some(doc) = self.get_one().await? else {
            return Ok(());
        };
        let id = self.require_id(&doc)?;
        adapter
            .update_document(&self.definition.collection_name, &id, update.clone())
            .await
    }

    /// Deletes every matching document. Same sequencing and id requirements
    /// as [`update`](Self::update).
    pub async fn delete(&self) -> DataResult<()> {
        let adapter = self.adapter()?;
        for doc in self.get().await? {
            let id = self.require_id(&doc)?;
            adapter
                .delete_document(&self.definition.collection_name, &id)
                .await?;
        }
        Ok(())
    }

    /// Deletes the first matching document. A query matching nothing is a
    /// silent no-op.
    pub async fn delete_one(&self) -> DataResult<()> {
        let adapter = self.adapter()?;
        let Some(doc) = self.get_one().await? else {
            return Ok(());
        };
        let id = self.require_id(&doc)?;
        adapter
            .delete_document(&self.definition.collection_name, &id)
            .await
    }

    /// Builds the normalized options handed to the adapter.
    pub fn options(&self) -> QueryOptions {
        QueryOptions {
            collection_name: self.definition.collection_name.clone(),
            filters: self.filters.clone(),
            raw_where: self.raw_where.clone(),
            limit: self.limit,
            offset: self.offset,
            sort_by: self.sort.clone(),
            fields: self
                .projection
                .clone()
                .unwrap_or_else(|| self.definition.field_names()),
        }
    }

    fn adapter(&self) -> DataResult<Arc<dyn DataAdapter>> {
        self.connections
            .get_adapter(&self.definition.connection_name)
            .ok_or_else(|| DataError::NoAdapterAttached(self.definition.connection_name.clone()))
    }

    fn pending_update(&self) -> DataResult<&Document> {
        self.pending_update
            .as_ref()
            .ok_or(DataError::MissingUpdatePayload)
    }

    fn require_id(&self, doc: &Document) -> DataResult<String> {
        document_id(doc)
            .ok_or_else(|| DataError::MissingDocumentId(self.definition.collection_name.clone()))
    }

    fn strip_undefined_fields(&self, data: Document) -> Document {
        if self.definition.allow_undefined_fields {
            return data;
        }
        let declared = self.definition.field_names();
        let (kept, dropped): (Vec<_>, Vec<_>) = data
            .into_iter()
            .partition(|(key, _)| declared.iter().any(|f| f == key));
        if !dropped.is_empty() {
            debug!(
                schema = %self.definition.name,
                dropped = ?dropped.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
                "dropping keys not declared by the schema"
            );
        }
        kept.into_iter().collect()
    }
}
