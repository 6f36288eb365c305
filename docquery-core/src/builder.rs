//! Fluent construction of [`QueryParameters`].
//!
//! A [`QueryBuilder`] accumulates clauses through `&mut self` chains. Nothing it holds
//! is visible to the pipeline until [`QueryBuilder::params`] takes a snapshot, which
//! also fills in the defaults configured in [`QueryConfig`]:
//!
//! - the path clause of [`QueryBuilder::at_path`],
//! - a default sort on the configured field (`file`, natural order) when none was given,
//! - a default-locale clause when locales are configured and no clause names `locale`.
//!
//! # Example
//!
//! ```ignore
//! use docquery_core::builder::QueryBuilder;
//! use docquery_core::params::SortKey;
//! use docquery_core::query::Filter;
//!
//! let mut builder = QueryBuilder::new();
//! builder
//!     .at_path("/blog")
//!     .filter(Filter::ne("draft", true))
//!     .sort(SortKey::desc("date"))
//!     .limit(5)
//!     .only(["title", "path"]);
//!
//! let params = builder.params();
//! ```

use bson::Document;
use log::trace;
use serde::Deserialize;

use crate::{
    document::fields,
    error::QueryResult,
    params::{Projection, QueryParameters, SortKey, Surround, SurroundTarget},
    query::{Condition, Filter},
};

/// Defaults applied when parameters are snapshotted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryConfig {
    /// Locales the content is available in. Empty disables locale defaulting.
    pub locales: Vec<String>,
    /// Locale injected when a query does not name one; falls back to the first locale.
    pub default_locale: Option<String>,
    /// Field sorted on (ascending, natural order) when a query has no sort.
    pub default_sort_field: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            locales: Vec::new(),
            default_locale: None,
            default_sort_field: fields::FILE.to_string(),
        }
    }
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locales<S: Into<String>>(mut self, locales: impl IntoIterator<Item = S>) -> Self {
        self.locales = locales.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }

    pub fn with_default_sort_field(mut self, field: impl Into<String>) -> Self {
        self.default_sort_field = field.into();
        self
    }

    /// The locale injected into queries without a locale clause.
    pub fn effective_default_locale(&self) -> Option<&str> {
        if self.locales.is_empty() {
            return None;
        }

        self.default_locale
            .as_deref()
            .or_else(|| self.locales.first().map(String::as_str))
    }
}

/// Mutable accumulator for query parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    config: QueryConfig,
    path: Option<String>,
    where_clauses: Vec<Condition>,
    sort: Vec<SortKey>,
    skip: Option<i64>,
    limit: Option<i64>,
    projection: Option<Projection>,
    surround: Option<Surround>,
    first: bool,
    count: bool,
}

impl QueryBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder applying `config` when snapshotting.
    pub fn with_config(config: QueryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Scopes the query to documents at or below `path`.
    ///
    /// A trailing slash is ignored.
    pub fn at_path(&mut self, path: &str) -> &mut Self {
        let trimmed = path.trim_end_matches('/');
        self.path = Some(if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() });
        self
    }

    /// Adds a clause; all clauses must match.
    pub fn filter(&mut self, condition: Condition) -> &mut Self {
        self.where_clauses.push(condition);
        self
    }

    /// Adds a clause written in document form.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidCondition`](crate::error::QueryError::InvalidCondition)
    /// when the document is not a valid condition; the builder is left unchanged.
    pub fn filter_document(&mut self, document: Document) -> QueryResult<&mut Self> {
        let condition = Condition::parse(document)?;
        Ok(self.filter(condition))
    }

    /// Restricts results to the given locale.
    pub fn locale(&mut self, locale: &str) -> &mut Self {
        self.filter(Filter::eq(fields::LOCALE, locale))
    }

    /// Replaces the sort with a single key.
    pub fn sort(&mut self, key: SortKey) -> &mut Self {
        self.sort = vec![key];
        self
    }

    /// Replaces the sort with the given keys, first key primary.
    pub fn sort_keys(&mut self, keys: impl IntoIterator<Item = SortKey>) -> &mut Self {
        self.sort = keys.into_iter().collect();
        self
    }

    /// Appends a tie-breaking sort key.
    pub fn then_sort(&mut self, key: SortKey) -> &mut Self {
        self.sort.push(key);
        self
    }

    pub fn skip(&mut self, skip: i64) -> &mut Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Keeps only the given top-level fields (plus `id`). Replaces any earlier projection.
    pub fn only<S: Into<String>>(&mut self, fields: impl IntoIterator<Item = S>) -> &mut Self {
        self.projection = Some(Projection::only(fields));
        self
    }

    /// Removes the given top-level fields. Replaces any earlier projection.
    pub fn without<S: Into<String>>(&mut self, fields: impl IntoIterator<Item = S>) -> &mut Self {
        self.projection = Some(Projection::without(fields));
        self
    }

    /// Returns a single document instead of a list.
    pub fn first(&mut self) -> &mut Self {
        self.first = true;
        self
    }

    /// Returns the number of matching documents instead of the documents.
    pub fn count(&mut self) -> &mut Self {
        self.count = true;
        self
    }

    /// Returns the `before` items preceding and `after` items following `target`.
    pub fn surround(
        &mut self,
        target: impl Into<SurroundTarget>,
        before: usize,
        after: usize,
    ) -> &mut Self {
        self.surround = Some(Surround {
            target: target.into(),
            before,
            after,
        });
        self
    }

    /// The configuration applied when snapshotting.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Takes an immutable snapshot of the accumulated parameters, with defaults applied.
    ///
    /// Calling this repeatedly yields equal snapshots.
    pub fn params(&self) -> QueryParameters {
        let mut where_clauses = Vec::with_capacity(self.where_clauses.len() + 2);

        if let Some(path) = &self.path {
            where_clauses.push(self.path_clause(path));
        }
        where_clauses.extend(self.where_clauses.iter().cloned());

        if let Some(locale) = self.config.effective_default_locale() {
            if !where_clauses.iter().any(|clause| clause.constrains(fields::LOCALE)) {
                trace!("defaulting query locale to {}", locale);
                where_clauses.push(Filter::eq(fields::LOCALE, locale));
            }
        }

        let sort = if self.sort.is_empty() {
            vec![SortKey::asc(self.config.default_sort_field.as_str()).numeric()]
        } else {
            self.sort.clone()
        };

        QueryParameters {
            where_clauses,
            sort,
            skip: self.skip,
            limit: self.limit,
            projection: self.projection.clone(),
            surround: self.surround.clone(),
            first: self.first,
            count: self.count,
        }
    }

    fn path_clause(&self, path: &str) -> Condition {
        if self.first && self.where_clauses.is_empty() {
            Filter::eq(fields::PATH, path)
        } else {
            Filter::pattern(fields::PATH, format!("/^{}/", regex::escape(path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::QueryError, params::ProjectionMode};
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_where_clauses_accumulate() {
        let mut builder = QueryBuilder::new();
        builder
            .filter(Filter::eq("category", "c1"))
            .filter_document(doc! { "id": { "$gt": 1 } })
            .unwrap()
            .locale("fr");

        assert_eq!(
            builder.params().where_clauses,
            vec![
                Filter::eq("category", "c1"),
                Filter::gt("id", 1),
                Filter::eq("locale", "fr"),
            ]
        );
    }

    #[test]
    fn test_invalid_document_leaves_builder_unchanged() {
        let mut builder = QueryBuilder::new();
        let result = builder.filter_document(doc! { "id": { "$between": [1, 2] } });

        assert!(matches!(result, Err(QueryError::InvalidCondition(_))));
        assert!(builder.params().where_clauses.is_empty());
    }

    #[test]
    fn test_default_sort() {
        let params = QueryBuilder::new().params();
        assert_eq!(params.sort, vec![SortKey::asc("file").numeric()]);

        let mut builder = QueryBuilder::new();
        builder.sort(SortKey::desc("date")).then_sort(SortKey::asc("title"));
        assert_eq!(
            builder.params().sort,
            vec![SortKey::desc("date"), SortKey::asc("title")]
        );
    }

    #[test]
    fn test_projection_last_call_wins() {
        let mut builder = QueryBuilder::new();
        builder.only(["name"]).without(["_"]);

        let projection = builder.params().projection.unwrap();
        assert_eq!(projection.mode, ProjectionMode::Without);
        assert!(projection.fields.contains("_"));
    }

    #[test]
    fn test_path_clause() {
        let mut builder = QueryBuilder::new();
        builder.at_path("/blog/");
        assert_eq!(
            builder.params().where_clauses,
            vec![Filter::pattern("path", "/^/blog/")]
        );

        builder.first();
        assert_eq!(builder.params().where_clauses, vec![Filter::eq("path", "/blog")]);

        builder.filter(Filter::eq("draft", false));
        assert_eq!(
            builder.params().where_clauses,
            vec![Filter::pattern("path", "/^/blog/"), Filter::eq("draft", false)]
        );
    }

    #[test]
    fn test_path_clause_escapes_metacharacters() {
        let mut builder = QueryBuilder::new();
        builder.at_path("/v1.0");
        assert_eq!(
            builder.params().where_clauses,
            vec![Filter::pattern("path", "/^/v1\\.0/")]
        );
    }

    #[test]
    fn test_default_locale() {
        let config = QueryConfig::new().with_locales(["en", "fr"]).with_default_locale("fr");

        let builder = QueryBuilder::with_config(config.clone());
        assert_eq!(builder.params().where_clauses, vec![Filter::eq("locale", "fr")]);

        let mut builder = QueryBuilder::with_config(config);
        builder.locale("en");
        assert_eq!(builder.params().where_clauses, vec![Filter::eq("locale", "en")]);

        let builder = QueryBuilder::new();
        assert!(builder.params().where_clauses.is_empty());
    }

    #[test]
    fn test_default_locale_falls_back_to_first_locale() {
        let config = QueryConfig::new().with_locales(["de", "en"]);
        assert_eq!(config.effective_default_locale(), Some("de"));
    }

    #[test]
    fn test_snapshot_is_pure() {
        let mut builder = QueryBuilder::with_config(QueryConfig::new().with_locales(["en"]));
        builder.at_path("/docs").surround("/docs/b", 1, 1).count();

        let first = builder.params();
        let second = builder.params();
        assert_eq!(first, second);

        builder.limit(3);
        assert_eq!(first.limit, None);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: QueryConfig = serde_json::from_value(serde_json::json!({ "locales": ["en"] })).unwrap();

        assert_eq!(config.default_sort_field, "file");
        assert_eq!(config.default_locale, None);
        assert_eq!(config.locales, vec!["en".to_string()]);
    }
}
