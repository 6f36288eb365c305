//! The content database context.
//!
//! [`ContentDatabase`] owns a [`KeyValueStorage`] laid out as follows:
//!
//! | key              | value                                          |
//! |------------------|------------------------------------------------|
//! | `cache:<id>`     | a published document                           |
//! | `navigation`     | the prebuilt default navigation tree           |
//! | `integrity`      | the content integrity the cache was built from |
//! | `<token>$`       | preview meta (`ignoreSources`)                 |
//! | `<token>:<id>`   | a preview document (`deleted: true` removes)   |
//!
//! # Example
//!
//! ```ignore
//! use docquery_core::backend::StaticFetcher;
//! use docquery_memory::ContentDatabase;
//!
//! let db = ContentDatabase::builder().integrity(1).build();
//! db.initialize(&StaticFetcher::new(documents)).await?;
//!
//! let docs = db.query(None).at_path("/docs").find().await?;
//! let navigation = db.generate_navigation(None, None).await?;
//! ```

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::future::try_join_all;
use log::{debug, info};
use mea::mutex::Mutex;
use serde::Deserialize;

use docquery_core::{
    backend::{Fetcher, KeyValueStorage},
    builder::{QueryBuilder, QueryConfig},
    document::{document_id, fields},
    error::{QueryError, QueryResult},
    navigation::{NavigationBuilder, NavigationNode, NavigationOptions, directory_meta},
    params::QueryParameters,
    query::Filter,
    wire,
};

use crate::{
    fetcher::ContentQuery,
    overlay::{load_delta, resolve},
    storage::{InMemoryStorage, PrefixedStorage},
};

/// Namespace of the published documents.
pub const CACHE_NAMESPACE: &str = "cache";
/// Key of the prebuilt navigation tree.
pub const NAVIGATION_KEY: &str = "navigation";
/// Key of the stored content integrity.
pub const INTEGRITY_KEY: &str = "integrity";

const DIRECTORY_META_PATTERN: &str = "(?i)/_dir$";

/// Configuration of a [`ContentDatabase`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Content integrity; the cache is rebuilt whenever it differs from the stored one.
    pub integrity: Option<u64>,
    /// Defaults applied to every query.
    pub query: QueryConfig,
    /// Options of generated navigation trees.
    pub navigation: NavigationOptions,
}

/// A content store with preview overlays and cached navigation.
///
/// Clones share the same storage and initialisation state.
///
/// # Type Parameters
///
/// * `S` - The key/value storage backing the database
#[derive(Debug, Clone)]
pub struct ContentDatabase<S = InMemoryStorage> {
    storage: S,
    config: Arc<DatabaseConfig>,
    initialized: Arc<Mutex<bool>>,
}

impl ContentDatabase<InMemoryStorage> {
    /// Creates a builder for a database over in-memory storage.
    pub fn builder() -> ContentDatabaseBuilder<InMemoryStorage> {
        ContentDatabaseBuilder::new()
    }
}

impl<S> ContentDatabase<S>
where
    S: KeyValueStorage + Clone + 'static,
{
    /// Creates a database over `storage`.
    pub fn new(storage: S, config: DatabaseConfig) -> Self {
        Self {
            storage,
            config: Arc::new(config),
            initialized: Arc::new(Mutex::new(false)),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Loads the published documents from `source` into storage.
    ///
    /// Runs once per database; concurrent callers wait for the first one. The cache is
    /// only rebuilt when the stored integrity differs from the configured one. Stale
    /// `cache:` entries are removed, every document is written under `cache:<id>`, the
    /// default navigation is stored under `navigation` and finally the integrity.
    ///
    /// # Errors
    ///
    /// Returns the source's error unchanged, [`QueryError::Initialization`] when a
    /// document has no `id`, or any storage failure.
    pub async fn initialize<F>(&self, source: &F) -> QueryResult<()>
    where
        F: Fetcher + ?Sized,
    {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return Ok(());
        }

        let integrity = self.config.integrity.unwrap_or_default();
        if self.stored_integrity().await? == Some(integrity) {
            debug!("content cache is current at integrity {}", integrity);
            *initialized = true;
            return Ok(());
        }

        let documents = source.fetch(None).await?;
        let cache = self.cache();

        let stale = cache.get_keys("").await?;
        try_join_all(stale.iter().map(|key| cache.remove_item(key))).await?;

        let entries = documents
            .iter()
            .map(|document| {
                document_id(document)
                    .map(|id| (id, Bson::Document(document.clone())))
                    .ok_or_else(|| {
                        QueryError::Initialization(format!(
                            "content document without {}: {:?}",
                            fields::ID,
                            document.get(fields::PATH)
                        ))
                    })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        try_join_all(entries.into_iter().map(|(id, document)| {
            let cache = &cache;
            async move { cache.set_item(&id, document).await }
        }))
        .await?;

        let navigation = self.build_navigation(None, None).await?;
        self.storage
            .set_item(NAVIGATION_KEY, bson::ser::serialize_to_bson(&navigation)?)
            .await?;

        let stored = i64::try_from(integrity)
            .map_err(|_| QueryError::Initialization(format!("integrity {} out of range", integrity)))?;
        self.storage.set_item(INTEGRITY_KEY, Bson::Int64(stored)).await?;

        info!("loaded {} content documents at integrity {}", documents.len(), integrity);
        *initialized = true;

        Ok(())
    }

    /// Returns the documents visible under the preview `token`, or the published ones.
    ///
    /// # Errors
    ///
    /// Returns any storage failure, or [`QueryError::Storage`] when a cached item is
    /// not a document.
    pub async fn items(&self, token: Option<&str>) -> QueryResult<Vec<Document>> {
        load_items(&self.storage, token).await
    }

    /// Starts a query over the documents visible under `token`.
    pub fn query(&self, token: Option<&str>) -> ContentQuery<DatabaseFetcher<S>> {
        ContentQuery::with_config(self.fetcher(token), self.config.query.clone())
    }

    /// Returns a fetcher over the documents visible under `token`.
    pub fn fetcher(&self, token: Option<&str>) -> DatabaseFetcher<S> {
        DatabaseFetcher {
            storage: self.storage.clone(),
            token: token.map(str::to_string),
        }
    }

    /// Builds the navigation tree of the documents matching `builder`.
    ///
    /// Partial, draft and navigation-disabled documents are excluded. Directory
    /// metadata comes from the partial `…/_dir` documents. Without a token or a
    /// builder the tree cached by [`ContentDatabase::initialize`] is returned.
    ///
    /// # Errors
    ///
    /// Returns any storage failure, or [`QueryError::Serialization`] when the cached
    /// tree cannot be decoded.
    pub async fn generate_navigation(
        &self,
        builder: Option<QueryBuilder>,
        token: Option<&str>,
    ) -> QueryResult<Vec<NavigationNode>> {
        if token.is_none() && builder.is_none() {
            if let Some(cached) = self.storage.get_item(NAVIGATION_KEY).await? {
                return Ok(bson::de::deserialize_from_bson(cached)?);
            }
        }

        self.build_navigation(builder, token).await
    }

    /// The cache key of `params` at the configured integrity.
    pub fn cache_key(&self, params: &QueryParameters) -> QueryResult<String> {
        wire::cache_key(params, self.config.integrity.unwrap_or_default())
    }

    async fn build_navigation(
        &self,
        builder: Option<QueryBuilder>,
        token: Option<&str>,
    ) -> QueryResult<Vec<NavigationNode>> {
        let mut builder = builder.unwrap_or_else(|| QueryBuilder::with_config(self.config.query.clone()));
        builder
            .filter(Filter::ne(fields::PARTIAL, true))
            .filter(Filter::ne(fields::NAVIGATION_ENABLED, false))
            .filter(Filter::ne(fields::DRAFT, true));
        let sort = builder.params().sort;

        let contents = ContentQuery::with_builder(self.fetcher(token), builder)
            .find()
            .await?;

        let mut configs = self.query(token);
        configs
            .filter(Filter::pattern(fields::PATH, DIRECTORY_META_PATTERN))
            .filter(Filter::eq(fields::PARTIAL, true));
        let configs = directory_meta(&configs.find().await?);

        let mut navigation = NavigationBuilder::with_options(self.config.navigation.clone());
        if !self.config.navigation.preserve_input_order {
            navigation = navigation.ordered_by(&sort);
        }

        Ok(navigation.build(&contents, &configs))
    }

    async fn stored_integrity(&self) -> QueryResult<Option<u64>> {
        Ok(match self.storage.get_item(INTEGRITY_KEY).await? {
            Some(Bson::Int64(value)) => u64::try_from(value).ok(),
            Some(Bson::Int32(value)) => u64::try_from(value).ok(),
            _ => None,
        })
    }

    fn cache(&self) -> PrefixedStorage<&S> {
        PrefixedStorage::new(&self.storage, CACHE_NAMESPACE)
    }
}

/// A fetcher over the documents of a [`ContentDatabase`], seen through a preview token.
#[derive(Debug, Clone)]
pub struct DatabaseFetcher<S> {
    storage: S,
    token: Option<String>,
}

#[async_trait]
impl<S> Fetcher for DatabaseFetcher<S>
where
    S: KeyValueStorage,
{
    async fn fetch(&self, _params: Option<&QueryParameters>) -> QueryResult<Vec<Document>> {
        load_items(&self.storage, self.token.as_deref()).await
    }
}

async fn load_items<S>(storage: &S, token: Option<&str>) -> QueryResult<Vec<Document>>
where
    S: KeyValueStorage,
{
    let cache = PrefixedStorage::new(storage, CACHE_NAMESPACE);
    let keys = cache.get_keys("").await?;
    let values = try_join_all(keys.iter().map(|key| cache.get_item(key))).await?;

    let mut base = BTreeMap::new();
    for (key, value) in keys.into_iter().zip(values) {
        match value {
            Some(Bson::Document(document)) => {
                base.insert(key, document);
            }
            Some(other) => {
                return Err(QueryError::Storage(format!(
                    "cached item {} is a {:?}, expected a document",
                    key,
                    other.element_type()
                )));
            }
            None => {}
        }
    }

    let delta = match token {
        Some(token) => load_delta(storage, token).await?,
        None => None,
    };

    Ok(resolve(&base, delta.as_ref()))
}

/// Builder for [`ContentDatabase`].
#[derive(Debug, Clone, Default)]
pub struct ContentDatabaseBuilder<S> {
    storage: S,
    config: DatabaseConfig,
}

impl ContentDatabaseBuilder<InMemoryStorage> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> ContentDatabaseBuilder<S>
where
    S: KeyValueStorage + Clone + 'static,
{
    /// Uses `storage` instead of the current one.
    pub fn storage<T>(self, storage: T) -> ContentDatabaseBuilder<T>
    where
        T: KeyValueStorage + Clone + 'static,
    {
        ContentDatabaseBuilder {
            storage,
            config: self.config,
        }
    }

    pub fn config(mut self, config: DatabaseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn integrity(mut self, integrity: u64) -> Self {
        self.config.integrity = Some(integrity);
        self
    }

    pub fn query_config(mut self, config: QueryConfig) -> Self {
        self.config.query = config;
        self
    }

    pub fn navigation_options(mut self, options: NavigationOptions) -> Self {
        self.config.navigation = options;
        self
    }

    pub fn build(self) -> ContentDatabase<S> {
        ContentDatabase::new(self.storage, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docquery_core::backend::StaticFetcher;
    use pretty_assertions::assert_eq;

    fn source() -> StaticFetcher {
        StaticFetcher::new(vec![
            doc! { "id": "content:index.md", "path": "/", "file": "index.md", "title": "Home" },
            doc! { "id": "content:1.guide:1.intro.md", "path": "/guide/intro", "file": "1.guide/1.intro.md", "title": "Intro" },
            doc! { "id": "content:1.guide:2.setup.md", "path": "/guide/setup", "file": "1.guide/2.setup.md", "title": "Setup" },
            doc! { "id": "content:1.guide:_dir.yml", "path": "/guide/_dir", "file": "1.guide/_dir.yml", "title": "dir", "partial": true, "body": { "title": "The Guide", "icon": "book" } },
            doc! { "id": "content:2.draft.md", "path": "/draft", "file": "2.draft.md", "title": "Draft", "draft": true },
        ])
    }

    #[tokio::test]
    async fn test_initialize_writes_layout() {
        let db = ContentDatabase::builder().integrity(3).build();
        db.initialize(&source()).await.unwrap();

        let storage = db.storage();
        assert_eq!(storage.get_item(INTEGRITY_KEY).await.unwrap(), Some(Bson::Int64(3)));
        assert_eq!(storage.get_keys("cache:").await.unwrap().len(), 5);
        assert!(storage.get_item(NAVIGATION_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_initialize_skips_current_integrity() {
        let storage = InMemoryStorage::new();
        storage.set_item(INTEGRITY_KEY, Bson::Int64(3)).await.unwrap();

        let db = ContentDatabase::builder().storage(storage.clone()).integrity(3).build();
        db.initialize(&source()).await.unwrap();

        assert!(storage.get_keys("cache:").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_replaces_stale_cache() {
        let storage = InMemoryStorage::new();
        storage.set_item(INTEGRITY_KEY, Bson::Int64(1)).await.unwrap();
        storage.set_item("cache:content:old.md", Bson::Document(doc! { "id": "content:old.md" })).await.unwrap();

        let db = ContentDatabase::builder().storage(storage.clone()).integrity(2).build();
        db.initialize(&source()).await.unwrap();

        assert_eq!(storage.get_item("cache:content:old.md").await.unwrap(), None);
        assert_eq!(storage.get_item(INTEGRITY_KEY).await.unwrap(), Some(Bson::Int64(2)));
    }

    #[tokio::test]
    async fn test_initialize_requires_ids() {
        let db = ContentDatabase::builder().build();
        let result = db.initialize(&StaticFetcher::new(vec![doc! { "path": "/x" }])).await;

        assert!(matches!(result, Err(QueryError::Initialization(_))));
    }

    #[tokio::test]
    async fn test_preview_items() {
        let db = ContentDatabase::builder().integrity(1).build();
        db.initialize(&source()).await.unwrap();

        let storage = db.storage();
        storage
            .set_item("tok:content:1.guide:3.new.md", Bson::Document(doc! { "id": "content:1.guide:3.new.md", "path": "/guide/new", "file": "1.guide/3.new.md", "title": "New" }))
            .await
            .unwrap();
        storage
            .set_item("tok:content:1.guide:2.setup.md", Bson::Document(doc! { "id": "content:1.guide:2.setup.md", "deleted": true }))
            .await
            .unwrap();

        assert_eq!(db.items(None).await.unwrap().len(), 5);

        let mut query = db.query(Some("tok"));
        query.at_path("/guide").filter(Filter::ne(fields::PARTIAL, true));
        let titles: Vec<String> = query
            .find()
            .await
            .unwrap()
            .iter()
            .filter_map(|d| d.get_str("title").ok().map(str::to_string))
            .collect();
        assert_eq!(titles, vec!["Intro", "New"]);
    }

    #[tokio::test]
    async fn test_generate_navigation() {
        let db = ContentDatabase::builder()
            .integrity(1)
            .navigation_options(NavigationOptions {
                fields: vec!["icon".into()],
                ..Default::default()
            })
            .build();
        db.initialize(&source()).await.unwrap();

        let cached = db.generate_navigation(None, None).await.unwrap();
        let built = db.build_navigation(None, None).await.unwrap();
        assert_eq!(cached, built);

        let paths: Vec<&str> = cached.iter().map(|node| node.path.as_str()).collect();
        assert_eq!(paths, vec!["/guide", "/"]);

        let guide = &cached[0];
        assert_eq!(guide.title, "The Guide");
        assert_eq!(guide.meta.get_str("icon").unwrap(), "book");
        let children: Vec<&str> = guide.children.iter().map(|node| node.title.as_str()).collect();
        assert_eq!(children, vec!["Intro", "Setup"]);
    }

    #[tokio::test]
    async fn test_cache_key_uses_integrity() {
        let db = ContentDatabase::builder().integrity(9).build();
        let key = db.cache_key(&db.query(None).params()).unwrap();

        assert!(key.ends_with(".9"));
        assert_eq!(key.len(), 64 + 2);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: DatabaseConfig = serde_json::from_value(serde_json::json!({
            "integrity": 5,
            "query": { "locales": ["en", "fr"] },
            "navigation": { "fields": ["icon"] }
        }))
        .unwrap();

        assert_eq!(config.integrity, Some(5));
        assert_eq!(config.query.effective_default_locale(), Some("en"));
        assert_eq!(config.navigation.fields, vec!["icon"]);
        assert!(!config.navigation.preserve_input_order);
    }
}
