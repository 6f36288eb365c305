//! Backend abstractions the query engine reads from.
//!
//! The engine never owns its documents. Each query calls a [`Fetcher`] for a fresh
//! snapshot, and the content database keeps its cache in a [`KeyValueStorage`].
//! Both traits are async and implementations must be thread-safe (`Send + Sync`).
//!
//! # Traits
//!
//! - [`Fetcher`]: Produces the documents a query runs against
//! - [`KeyValueStorage`]: A minimal string-keyed store of BSON values
//!
//! # Examples
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bson::{Document, doc};
//! use docquery_core::{backend::Fetcher, error::QueryResult, params::QueryParameters};
//!
//! #[derive(Debug)]
//! struct Static(Vec<Document>);
//!
//! #[async_trait]
//! impl Fetcher for Static {
//!     async fn fetch(&self, _params: Option<&QueryParameters>) -> QueryResult<Vec<Document>> {
//!         Ok(self.0.clone())
//!     }
//! }
//! ```

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::{error::QueryResult, params::QueryParameters};

/// Source of the documents a query is executed against.
///
/// # Errors
///
/// Failures are returned as-is to the caller of the query; the engine does not retry.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    /// Returns the documents to query.
    ///
    /// `params` is the frozen query about to run, so remote fetchers may forward it
    /// (see [`crate::wire`]). Local fetchers are free to ignore it: the pipeline always
    /// applies the full query to whatever is returned.
    async fn fetch(&self, params: Option<&QueryParameters>) -> QueryResult<Vec<Document>>;
}

#[async_trait]
impl<F> Fetcher for &F
where
    F: Fetcher,
{
    async fn fetch(&self, params: Option<&QueryParameters>) -> QueryResult<Vec<Document>> {
        (*self).fetch(params).await
    }
}

#[async_trait]
impl<F> Fetcher for Arc<F>
where
    F: Fetcher + ?Sized,
{
    async fn fetch(&self, params: Option<&QueryParameters>) -> QueryResult<Vec<Document>> {
        self.as_ref().fetch(params).await
    }
}

/// A fetcher over a fixed set of documents.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    documents: Vec<Document>,
}

impl StaticFetcher {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, _params: Option<&QueryParameters>) -> QueryResult<Vec<Document>> {
        Ok(self.documents.clone())
    }
}

/// String-keyed storage of BSON values.
///
/// Keys are opaque to the storage; the content database lays them out as
/// `cache:<id>`, `navigation`, `integrity`, `<token>$` and `<token>:<id>`.
#[async_trait]
pub trait KeyValueStorage: Send + Sync + Debug {
    /// Returns the value stored under `key`, if any.
    async fn get_item(&self, key: &str) -> QueryResult<Option<Bson>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: Bson) -> QueryResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> QueryResult<()>;

    /// Lists the keys starting with `prefix`, in ascending order.
    async fn get_keys(&self, prefix: &str) -> QueryResult<Vec<String>>;
}

#[async_trait]
impl<S> KeyValueStorage for &S
where
    S: KeyValueStorage,
{
    async fn get_item(&self, key: &str) -> QueryResult<Option<Bson>> {
        (*self).get_item(key).await
    }

    async fn set_item(&self, key: &str, value: Bson) -> QueryResult<()> {
        (*self).set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> QueryResult<()> {
        (*self).remove_item(key).await
    }

    async fn get_keys(&self, prefix: &str) -> QueryResult<Vec<String>> {
        (*self).get_keys(prefix).await
    }
}

#[async_trait]
impl<S> KeyValueStorage for Arc<S>
where
    S: KeyValueStorage + ?Sized,
{
    async fn get_item(&self, key: &str) -> QueryResult<Option<Bson>> {
        self.as_ref().get_item(key).await
    }

    async fn set_item(&self, key: &str, value: Bson) -> QueryResult<()> {
        self.as_ref().set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> QueryResult<()> {
        self.as_ref().remove_item(key).await
    }

    async fn get_keys(&self, prefix: &str) -> QueryResult<Vec<String>> {
        self.as_ref().get_keys(prefix).await
    }
}
