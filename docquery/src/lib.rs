//! An embedded, in-memory document query engine.
//!
//! This crate is the primary entry point of docquery. It re-exports the query model
//! from `docquery-core` and the in-memory engine from `docquery-memory`.
//!
//! # Features
//!
//! - **MongoDB-like conditions** - `$eq`, `$in`, `$contains`, `$regex` and friends, combined with `$and`, `$or` and `$not`
//! - **Locale-aware sorting** - Multi-key sorts with numeric collation and case ordering
//! - **Surround lookups** - The items before and after a target in the sorted results
//! - **Preview overlays** - Token-scoped additions and deletions over the published set
//! - **Navigation trees** - Hierarchical site maps built from document paths
//!
//! # Quick Start
//!
//! ```ignore
//! use docquery::{prelude::*, bson::doc};
//!
//! #[tokio::main]
//! async fn main() -> QueryResult<()> {
//!     let fetcher = StaticFetcher::new(vec![
//!         doc! { "id": "content:1.intro.md", "path": "/intro", "file": "1.intro.md", "title": "Intro" },
//!         doc! { "id": "content:2.setup.md", "path": "/setup", "file": "2.setup.md", "title": "Setup" },
//!     ]);
//!
//!     // Query the documents directly
//!     let mut query = ContentQuery::new(&fetcher);
//!     query.filter_document(doc! { "title": { "$icontains": "intro" } })?;
//!     let intro = query.find_one().await?;
//!
//!     // Find the pages around /intro
//!     let window = ContentQuery::new(&fetcher).find_surround("/intro", 1, 1).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Content Database
//!
//! [`memory::ContentDatabase`] caches the published documents in a key/value storage,
//! overlays preview edits and serves navigation trees.
//!
//! ```ignore
//! use docquery::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> QueryResult<()> {
//!     let db = ContentDatabase::builder().integrity(1).build();
//!     db.initialize(&StaticFetcher::new(documents)).await?;
//!
//!     // Published documents under /guide, ordered by title
//!     let mut query = db.query(None);
//!     query.at_path("/guide").sort(SortKey::asc("title"));
//!     let guide = query.find().await?;
//!
//!     // The same documents as seen by a preview
//!     let preview = db.query(Some("preview-token")).at_path("/guide").find().await?;
//!
//!     // Navigation of the published site
//!     let navigation = db.generate_navigation(None, None).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod prelude;

pub use docquery_core::{backend, builder, collation, document, error, navigation, params, query, wire};

// Re-export BSON types for convenience
pub use bson;

/// In-memory execution and storage.
pub mod memory {
    pub use docquery_memory::{
        ContentDatabase, ContentDatabaseBuilder, ContentQuery, DatabaseConfig, DatabaseFetcher,
        InMemoryStorage, PrefixedStorage, PreviewDelta, QueryOutput, database, evaluator, execute,
        fetcher, overlay, pipeline, storage,
    };
}
