//! In-memory key/value storage.
//!
//! This module provides [`InMemoryStorage`], a [`KeyValueStorage`] backed by an ordered
//! map behind an async-aware read-write lock, and [`PrefixedStorage`], which scopes
//! any storage to a key namespace.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use bson::Bson;
use mea::rwlock::RwLock;

use docquery_core::{backend::KeyValueStorage, error::QueryResult};

/// Separator between a namespace and the keys inside it.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Thread-safe in-memory key/value storage.
///
/// `InMemoryStorage` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Example
///
/// ```ignore
/// use docquery_memory::InMemoryStorage;
/// use docquery_core::backend::KeyValueStorage;
///
/// let storage = InMemoryStorage::new();
/// storage.set_item("integrity", 42_i64.into()).await?;
/// assert!(storage.get_item("integrity").await?.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStorage {
    items: Arc<RwLock<BTreeMap<String, Bson>>>,
}

impl InMemoryStorage {
    /// Creates a new empty storage.
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Removes every item.
    pub async fn clear(&self) {
        self.items.write().await.clear();
    }
}

#[async_trait]
impl KeyValueStorage for InMemoryStorage {
    async fn get_item(&self, key: &str) -> QueryResult<Option<Bson>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: Bson) -> QueryResult<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> QueryResult<()> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn get_keys(&self, prefix: &str) -> QueryResult<Vec<String>> {
        let items = self.items.read().await;

        Ok(items
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// A view of a storage restricted to the keys under `<namespace>:`.
///
/// Keys passed in and returned are relative to the namespace.
#[derive(Clone, Debug)]
pub struct PrefixedStorage<S> {
    inner: S,
    prefix: String,
}

impl<S> PrefixedStorage<S>
where
    S: KeyValueStorage,
{
    pub fn new(inner: S, namespace: &str) -> Self {
        Self {
            inner,
            prefix: format!("{}{}", namespace, NAMESPACE_SEPARATOR),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl<S> KeyValueStorage for PrefixedStorage<S>
where
    S: KeyValueStorage,
{
    async fn get_item(&self, key: &str) -> QueryResult<Option<Bson>> {
        self.inner.get_item(&self.key(key)).await
    }

    async fn set_item(&self, key: &str, value: Bson) -> QueryResult<()> {
        self.inner.set_item(&self.key(key), value).await
    }

    async fn remove_item(&self, key: &str) -> QueryResult<()> {
        self.inner.remove_item(&self.key(key)).await
    }

    async fn get_keys(&self, prefix: &str) -> QueryResult<Vec<String>> {
        let keys = self.inner.get_keys(&self.key(prefix)).await?;

        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(self.prefix.as_str()).map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_set_get_remove() {
        let storage = InMemoryStorage::new();

        storage.set_item("integrity", Bson::Int64(7)).await.unwrap();
        assert_eq!(storage.get_item("integrity").await.unwrap(), Some(Bson::Int64(7)));

        storage.remove_item("integrity").await.unwrap();
        assert_eq!(storage.get_item("integrity").await.unwrap(), None);
        storage.remove_item("integrity").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_by_prefix() {
        let storage = InMemoryStorage::new();
        for key in ["cache:b", "cache:a", "navigation", "cachet", "token:a"] {
            storage.set_item(key, Bson::Boolean(true)).await.unwrap();
        }

        assert_eq!(storage.get_keys("cache:").await.unwrap(), vec!["cache:a", "cache:b"]);
        assert_eq!(storage.get_keys("").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let storage = InMemoryStorage::new();
        let clone = storage.clone();

        clone.set_item("a", Bson::Int32(1)).await.unwrap();
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_prefixed_storage() {
        let storage = InMemoryStorage::new();
        let cache = PrefixedStorage::new(storage.clone(), "cache");

        cache.set_item("content:a.md", Bson::Int32(1)).await.unwrap();
        storage.set_item("navigation", Bson::Int32(2)).await.unwrap();

        assert_eq!(storage.get_item("cache:content:a.md").await.unwrap(), Some(Bson::Int32(1)));
        assert_eq!(cache.get_keys("").await.unwrap(), vec!["content:a.md"]);
        assert_eq!(cache.get_item("navigation").await.unwrap(), None);
    }
}
