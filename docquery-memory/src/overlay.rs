//! Preview overlays.
//!
//! A preview token scopes a set of unpublished edits on top of the cached documents.
//! [`load_delta`] reads the edits for a token from storage and [`resolve`] merges them
//! over the base set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bson::{Bson, Document};
use log::debug;

use docquery_core::{
    backend::KeyValueStorage,
    document::{document_id, fields, is_truthy},
    error::{QueryError, QueryResult},
};

/// Field of the preview meta item listing sources to hide.
pub const IGNORE_SOURCES: &str = "ignoreSources";

/// Token-scoped additions and deletions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewDelta {
    /// Documents added or replaced by the preview, in storage order.
    pub upserts: Vec<Document>,
    /// Ids removed by the preview.
    pub deleted_ids: BTreeSet<String>,
    /// Sources whose cached documents are hidden (ids starting with `<source>:`).
    pub ignored_source_prefixes: Vec<String>,
}

impl PreviewDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(mut self, document: Document) -> Self {
        self.upserts.push(document);
        self
    }

    pub fn delete(mut self, id: impl Into<String>) -> Self {
        self.deleted_ids.insert(id.into());
        self
    }

    pub fn ignore_source(mut self, source: impl Into<String>) -> Self {
        self.ignored_source_prefixes.push(source.into());
        self
    }

    fn hides(&self, id: &str) -> bool {
        self.ignored_source_prefixes.iter().any(|source| {
            id.strip_prefix(source.trim())
                .is_some_and(|rest| rest.starts_with(':'))
        })
    }
}

/// Merges `delta` over the `base` documents keyed by id.
///
/// Base documents come first in key order, followed by the upserts. An upsert replaces
/// any base document with the same id, and a later upsert replaces an earlier one in
/// place. Upserts without an id are dropped, so the result never holds two documents
/// with the same id.
pub fn resolve(base: &BTreeMap<String, Document>, delta: Option<&PreviewDelta>) -> Vec<Document> {
    let Some(delta) = delta else {
        return base.values().cloned().collect();
    };

    let mut upserts: Vec<Document> = Vec::with_capacity(delta.upserts.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for document in &delta.upserts {
        let Some(id) = document_id(document) else {
            debug!("skipping preview upsert without an id");
            continue;
        };
        if delta.deleted_ids.contains(&id) {
            continue;
        }
        match positions.get(&id).copied() {
            Some(position) => upserts[position] = document.clone(),
            None => {
                positions.insert(id, upserts.len());
                upserts.push(document.clone());
            }
        }
    }

    base.iter()
        .filter(|(id, _)| {
            !delta.hides(id) && !delta.deleted_ids.contains(*id) && !positions.contains_key(*id)
        })
        .map(|(_, document)| document.clone())
        .chain(upserts)
        .collect()
}

/// Reads the preview delta stored for `token`.
///
/// The meta item lives under `<token>$` and each edited document under `<token>:<id>`.
/// A document with `deleted: true` marks its id as deleted. Returns `None` when
/// nothing is stored for the token.
///
/// # Errors
///
/// Propagates storage failures, and returns [`QueryError::Storage`] when a stored
/// item is not a document.
pub async fn load_delta<S>(storage: &S, token: &str) -> QueryResult<Option<PreviewDelta>>
where
    S: KeyValueStorage + ?Sized,
{
    let meta = storage.get_item(&format!("{}$", token)).await?;
    let prefix = format!("{}:", token);
    let keys = storage.get_keys(&prefix).await?;

    if meta.is_none() && keys.is_empty() {
        debug!("no preview stored for token {}", token);
        return Ok(None);
    }

    let mut delta = PreviewDelta::new();

    if let Some(Bson::Document(meta)) = &meta {
        if let Ok(sources) = meta.get_array(IGNORE_SOURCES) {
            delta.ignored_source_prefixes = sources
                .iter()
                .filter_map(Bson::as_str)
                .map(|source| source.trim().to_string())
                .collect();
        }
    }

    for key in keys {
        let mut document = match storage.get_item(&key).await? {
            Some(Bson::Document(document)) => document,
            Some(other) => {
                return Err(QueryError::Storage(format!(
                    "preview item {} is a {:?}, expected a document",
                    key,
                    other.element_type()
                )));
            }
            None => continue,
        };

        let id = match document_id(&document) {
            Some(id) => id,
            None => {
                let id = key[prefix.len()..].to_string();
                document.insert(fields::ID, id.clone());
                id
            }
        };
        if document.get(fields::DELETED).is_some_and(is_truthy) {
            delta.deleted_ids.insert(id);
        } else {
            delta.upserts.push(document);
        }
    }

    debug!(
        "loaded preview {}: {} upserts, {} deletions, {} ignored sources",
        token,
        delta.upserts.len(),
        delta.deleted_ids.len(),
        delta.ignored_source_prefixes.len()
    );

    Ok(Some(delta))
}
