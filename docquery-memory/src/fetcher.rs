//! Queries bound to a fetcher.
//!
//! A [`ContentQuery`] pairs a [`QueryBuilder`] with the [`Fetcher`] it runs against.
//! The chain methods accumulate parameters exactly like the builder; the terminal
//! methods snapshot them, fetch a fresh set of documents and execute the pipeline.
//!
//! # Example
//!
//! ```ignore
//! use docquery_core::{backend::StaticFetcher, params::SortKey, query::Filter};
//! use docquery_memory::ContentQuery;
//!
//! let fetcher = StaticFetcher::new(documents);
//! let posts = ContentQuery::new(&fetcher)
//!     .at_path("/blog")
//!     .filter(Filter::ne("draft", true))
//!     .sort(SortKey::desc("date"))
//!     .limit(10)
//!     .find()
//!     .await?;
//! ```

use bson::Document;
use serde::de::DeserializeOwned;

use docquery_core::{
    backend::Fetcher,
    builder::{QueryBuilder, QueryConfig},
    error::{QueryError, QueryResult},
    params::{QueryParameters, SortKey, Surround, SurroundTarget},
    query::Condition,
};

use crate::pipeline::{QueryOutput, execute};

/// A query under construction against a fetcher.
///
/// # Type Parameters
///
/// * `F` - The fetcher documents are loaded from on each terminal call
#[derive(Debug, Clone)]
pub struct ContentQuery<F> {
    fetcher: F,
    builder: QueryBuilder,
}

impl<F> ContentQuery<F>
where
    F: Fetcher,
{
    /// Creates a query with the default configuration.
    pub fn new(fetcher: F) -> Self {
        Self::with_builder(fetcher, QueryBuilder::new())
    }

    /// Creates a query applying `config` when snapshotting.
    pub fn with_config(fetcher: F, config: QueryConfig) -> Self {
        Self::with_builder(fetcher, QueryBuilder::with_config(config))
    }

    /// Creates a query starting from the parameters already held by `builder`.
    pub fn with_builder(fetcher: F, builder: QueryBuilder) -> Self {
        Self { fetcher, builder }
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut QueryBuilder {
        &mut self.builder
    }

    pub fn into_builder(self) -> QueryBuilder {
        self.builder
    }

    pub fn at_path(&mut self, path: &str) -> &mut Self {
        self.builder.at_path(path);
        self
    }

    pub fn filter(&mut self, condition: Condition) -> &mut Self {
        self.builder.filter(condition);
        self
    }

    /// Adds a clause written in document form.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidCondition`] when the document is not a valid condition.
    pub fn filter_document(&mut self, document: Document) -> QueryResult<&mut Self> {
        self.builder.filter_document(document)?;
        Ok(self)
    }

    pub fn locale(&mut self, locale: &str) -> &mut Self {
        self.builder.locale(locale);
        self
    }

    pub fn sort(&mut self, key: SortKey) -> &mut Self {
        self.builder.sort(key);
        self
    }

    pub fn sort_keys(&mut self, keys: impl IntoIterator<Item = SortKey>) -> &mut Self {
        self.builder.sort_keys(keys);
        self
    }

    pub fn then_sort(&mut self, key: SortKey) -> &mut Self {
        self.builder.then_sort(key);
        self
    }

    pub fn skip(&mut self, skip: i64) -> &mut Self {
        self.builder.skip(skip);
        self
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.builder.limit(limit);
        self
    }

    pub fn only<S: Into<String>>(&mut self, fields: impl IntoIterator<Item = S>) -> &mut Self {
        self.builder.only(fields);
        self
    }

    pub fn without<S: Into<String>>(&mut self, fields: impl IntoIterator<Item = S>) -> &mut Self {
        self.builder.without(fields);
        self
    }

    /// Snapshot of the accumulated parameters, as a plain `find` would run them.
    pub fn params(&self) -> QueryParameters {
        self.snapshot(false, false, None)
    }

    /// Fetches and returns every matching document.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error unchanged, or
    /// [`QueryError::InvalidRegex`] when a pattern does not compile.
    pub async fn find(&self) -> QueryResult<Vec<Document>> {
        match self.run(self.params()).await? {
            QueryOutput::Documents(documents) => Ok(documents),
            other => Err(unexpected("documents", &other)),
        }
    }

    /// Fetches and returns the first matching document, if any.
    ///
    /// # Errors
    ///
    /// Same as [`ContentQuery::find`].
    pub async fn find_one(&self) -> QueryResult<Option<Document>> {
        match self.run(self.snapshot(true, false, None)).await? {
            QueryOutput::Document(document) => Ok(document),
            other => Err(unexpected("a document", &other)),
        }
    }

    /// Fetches the `before` documents preceding and `after` documents following the
    /// first match of `target`.
    ///
    /// # Arguments
    ///
    /// * `target` - A path or a condition locating the pivot document
    /// * `before` - Number of preceding slots
    /// * `after` - Number of following slots
    ///
    /// # Returns
    ///
    /// A window of exactly `before + after` slots. Slots beyond either end of the
    /// results, or all of them when the target is not found, are `None`.
    ///
    /// # Errors
    ///
    /// Same as [`ContentQuery::find`].
    pub async fn find_surround(
        &self,
        target: impl Into<SurroundTarget>,
        before: usize,
        after: usize,
    ) -> QueryResult<Vec<Option<Document>>> {
        let surround = Surround {
            target: target.into(),
            before,
            after,
        };

        match self.run(self.snapshot(false, false, Some(surround))).await? {
            QueryOutput::Surround(window) => Ok(window),
            other => Err(unexpected("a surround window", &other)),
        }
    }

    /// Counts the matching documents, ignoring pagination.
    ///
    /// # Errors
    ///
    /// Same as [`ContentQuery::find`].
    pub async fn count(&self) -> QueryResult<usize> {
        match self.run(self.snapshot(false, true, None)).await? {
            QueryOutput::Count(count) => Ok(count),
            other => Err(unexpected("a count", &other)),
        }
    }

    /// Like [`ContentQuery::find`], deserializing each document into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Serialization`] when a document does not fit `T`.
    pub async fn find_as<T>(&self) -> QueryResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.find()
            .await?
            .into_iter()
            .map(|document| bson::de::deserialize_from_document(document).map_err(QueryError::from))
            .collect()
    }

    /// Like [`ContentQuery::find_one`], deserializing the document into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Serialization`] when the document does not fit `T`.
    pub async fn find_one_as<T>(&self) -> QueryResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.find_one()
            .await?
            .map(|document| bson::de::deserialize_from_document(document).map_err(QueryError::from))
            .transpose()
    }

    /// Snapshots the builder with the flags of one terminal call.
    ///
    /// `first` also goes through the builder, since it turns a path scope into an
    /// exact path match.
    fn snapshot(&self, first: bool, count: bool, surround: Option<Surround>) -> QueryParameters {
        let mut builder = self.builder.clone();
        if first {
            builder.first();
        }

        let mut params = builder.params();
        params.first = first;
        params.count = count;
        params.surround = surround;
        params
    }

    async fn run(&self, params: QueryParameters) -> QueryResult<QueryOutput> {
        let documents = self.fetcher.fetch(Some(&params)).await?;
        execute(documents, &params)
    }
}

fn unexpected(expected: &str, output: &QueryOutput) -> QueryError {
    QueryError::InvalidParameters(format!("expected {} from the pipeline, got {:?}", expected, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bson::doc;
    use docquery_core::{backend::StaticFetcher, query::Filter};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    fn fetcher() -> StaticFetcher {
        StaticFetcher::new(vec![
            doc! { "id": "a", "path": "/a", "file": "1.a.md", "title": "A" },
            doc! { "id": "b", "path": "/b", "file": "2.b.md", "title": "B" },
            doc! { "id": "c", "path": "/c", "file": "3.c.md", "title": "C" },
        ])
    }

    fn titles(documents: &[Document]) -> Vec<&str> {
        documents.iter().filter_map(|d| d.get_str("title").ok()).collect()
    }

    #[tokio::test]
    async fn test_find_uses_default_order() {
        let found = ContentQuery::new(fetcher()).find().await.unwrap();
        assert_eq!(titles(&found), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_terminals_do_not_leak_flags() {
        let mut query = ContentQuery::new(fetcher());
        query.filter(Filter::ne("id", "b"));

        assert_eq!(query.count().await.unwrap(), 2);
        assert_eq!(query.find_one().await.unwrap().unwrap().get_str("id").unwrap(), "a");
        assert_eq!(query.find().await.unwrap().len(), 2);
        assert!(!query.params().first);
    }

    #[tokio::test]
    async fn test_find_one_at_path_is_exact() {
        let fetcher = StaticFetcher::new(vec![
            doc! { "id": "a", "path": "/blog/post", "file": "1.blog/1.post.md", "title": "Post" },
            doc! { "id": "b", "path": "/blog", "file": "1.blog/index.md", "title": "Blog" },
        ]);
        let mut query = ContentQuery::new(&fetcher);
        query.at_path("/blog/");

        assert_eq!(titles(&query.find().await.unwrap()), vec!["Post", "Blog"]);
        assert_eq!(query.find_one().await.unwrap().unwrap().get_str("title").unwrap(), "Blog");
    }

    #[tokio::test]
    async fn test_find_surround() {
        let query = ContentQuery::new(fetcher());

        let window = query.find_surround("/b", 1, 1).await.unwrap();
        let paths: Vec<Option<&str>> = window
            .iter()
            .map(|slot| slot.as_ref().and_then(|d| d.get_str("path").ok()))
            .collect();
        assert_eq!(paths, vec![Some("/a"), Some("/c")]);

        let window = query.find_surround("/missing", 1, 2).await.unwrap();
        assert_eq!(window, vec![None, None, None]);
    }

    #[tokio::test]
    async fn test_fetch_receives_params() {
        #[derive(Debug)]
        struct Recording(std::sync::Mutex<Vec<QueryParameters>>);

        #[async_trait]
        impl Fetcher for Recording {
            async fn fetch(&self, params: Option<&QueryParameters>) -> QueryResult<Vec<Document>> {
                self.0.lock().unwrap().extend(params.cloned());
                Ok(Vec::new())
            }
        }

        let recording = Recording(std::sync::Mutex::new(Vec::new()));
        let mut query = ContentQuery::new(&recording);
        query.limit(3);
        query.count().await.unwrap();

        let seen = recording.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].count);
        assert_eq!(seen[0].limit, Some(3));
    }

    #[tokio::test]
    async fn test_fetch_errors_propagate() {
        #[derive(Debug)]
        struct Failing;

        #[async_trait]
        impl Fetcher for Failing {
            async fn fetch(&self, _params: Option<&QueryParameters>) -> QueryResult<Vec<Document>> {
                Err(QueryError::Fetch("offline".into()))
            }
        }

        let result = ContentQuery::new(Failing).find().await;
        assert!(matches!(result, Err(QueryError::Fetch(message)) if message == "offline"));
    }

    #[tokio::test]
    async fn test_find_as() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Page {
            id: String,
            title: String,
        }

        let mut query = ContentQuery::new(fetcher());
        query.filter(Filter::eq("id", "c"));

        let page: Option<Page> = query.find_one_as().await.unwrap();
        assert_eq!(page, Some(Page { id: "c".into(), title: "C".into() }));
    }
}
