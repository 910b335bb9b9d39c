//! HTTP API storage adapter for polystore.
//!
//! Treats a REST-style API as a document store: collections map to
//! `GET/POST /collection` and documents to `PUT|PATCH/DELETE /collection/{id}`.
//! Query parameters follow the `_sort`/`_order`/`_limit`/`_page` conventions;
//! write payloads can travel as JSON, multipart form data or urlencoded
//! forms, and an optional bearer token is attached to every request.

pub mod adapter;
pub mod url;

pub use adapter::{BodyKind, HttpAdapter, HttpConfig, UpdateMethod};
