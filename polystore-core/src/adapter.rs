//! The storage adapter contract every backend implements.
//!
//! An adapter translates the shared [`QueryOptions`] vocabulary and the CRUD
//! operations into one backend's native driver calls. Adapters are attached
//! to a named connection in the [`ConnectionRegistry`](crate::connection::ConnectionRegistry)
//! and dispatched by reference; no per-call type inspection takes place.
//!
//! # Provided fallbacks
//!
//! Backends without a native single-result primitive inherit [`get_one`]
//! (first element of a full query), and backends without native conditional
//! mutation inherit [`update_by_filter`]/[`delete_by_filter`] (read the
//! matches, then mutate each by id, sequentially). The simulated bulk path
//! aborts on the first failure and does not roll back earlier mutations.
//!
//! [`get_one`]: DataAdapter::get_one
//! [`update_by_filter`]: DataAdapter::update_by_filter
//! [`delete_by_filter`]: DataAdapter::delete_by_filter

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    document::{Document, document_id},
    error::{DataError, DataResult},
    query::QueryOptions,
};

/// Abstract interface for storage backends.
///
/// All methods are async and suspend only at I/O boundaries; none of the
/// operations is internally concurrent. Implementations must be thread-safe
/// (`Send + Sync`) because one adapter instance is shared by every query
/// issued against its connection.
#[async_trait]
pub trait DataAdapter: Send + Sync + Debug {
    /// Runs a query and returns the full matching document set.
    async fn get_documents(&self, options: &QueryOptions) -> DataResult<Vec<Document>>;

    /// Returns the first matching document, or `None` when nothing matches.
    ///
    /// The default implementation caps the query at one result and takes the
    /// first element; backends with a cheaper native primitive may override.
    async fn get_one(&self, options: &QueryOptions) -> DataResult<Option<Document>> {
        let mut documents = self.get_documents(&options.first_only()).await?;
        if documents.is_empty() {
            Ok(None)
        } else {
            Ok(Some(documents.remove(0)))
        }
    }

    /// Inserts a document and returns the backend-generated id.
    async fn add_document(&self, collection: &str, data: Document) -> DataResult<String>;

    /// Replaces/merges the fields of the document identified by `id`.
    async fn update_document(&self, collection: &str, id: &str, data: Document) -> DataResult<()>;

    /// Deletes the document identified by `id`.
    async fn delete_document(&self, collection: &str, id: &str) -> DataResult<()>;

    /// Applies `data` to every document matching `options`, or only the first
    /// match when `limit_to_one` is set.
    ///
    /// The default implementation simulates conditional mutation: it reads
    /// the matches and updates each one by id, one round trip per document,
    /// in the order the read returned them. Every target must carry an `id`;
    /// the first one without fails with [`DataError::MissingDocumentId`].
    async fn update_by_filter(
        &self,
        options: &QueryOptions,
        data: Document,
        limit_to_one: bool,
    ) -> DataResult<()> {
        for id in self.matching_ids(options, limit_to_one).await? {
            self.update_document(&options.collection_name, &id, data.clone())
                .await?;
        }
        Ok(())
    }

    /// Deletes every document matching `options`, or only the first match
    /// when `limit_to_one` is set. Same simulation and ordering semantics as
    /// [`update_by_filter`](DataAdapter::update_by_filter).
    async fn delete_by_filter(&self, options: &QueryOptions, limit_to_one: bool) -> DataResult<()> {
        for id in self.matching_ids(options, limit_to_one).await? {
            self.delete_document(&options.collection_name, &id).await?;
        }
        Ok(())
    }

    /// Resolves the ids of the documents targeted by a simulated bulk
    /// mutation.
    async fn matching_ids(&self, options: &QueryOptions, limit_to_one: bool) -> DataResult<Vec<String>> {
        let documents = if limit_to_one {
            self.get_one(options).await?.into_iter().collect()
        } else {
            self.get_documents(options).await?
        };

        documents
            .iter()
            .map(|doc| {
                document_id(doc)
                    .ok_or_else(|| DataError::MissingDocumentId(options.collection_name.clone()))
            })
            .collect()
    }
}
