//! In-memory query execution for docquery.
//!
//! This crate runs the queries described by `docquery-core` over snapshots of
//! documents held in memory.
//!
//! # Features
//!
//! - **Match evaluation** ([`evaluator`]) - Condition trees evaluated against single documents
//! - **Pipeline execution** ([`pipeline`]) - Filter, count, sort, paginate, project and surround
//! - **Fetch-bound queries** ([`fetcher`]) - Builders that fetch a fresh snapshot per terminal call
//! - **Key/value storage** ([`storage`]) - Thread-safe in-memory storage with namespacing
//! - **Preview overlays** ([`overlay`]) - Token-scoped edits merged over the published documents
//! - **Content database** ([`database`]) - Cached documents, previews and navigation in one context
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use docquery_core::{backend::StaticFetcher, params::SortKey, query::Filter};
//! use docquery_memory::ContentQuery;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = StaticFetcher::new(vec![
//!         doc! { "id": "1", "path": "/hello", "title": "Hello", "category": "c1" },
//!         doc! { "id": "2", "path": "/world", "title": "World", "category": "c2" },
//!     ]);
//!
//!     let mut query = ContentQuery::new(&fetcher);
//!     query
//!         .filter(Filter::is_in("category", vec!["c1", "c3"]))
//!         .sort(SortKey::asc("title"));
//!
//!     let documents = query.find().await?;
//!     assert_eq!(documents.len(), 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docquery_memory;

pub mod database;
pub mod evaluator;
pub mod fetcher;
pub mod overlay;
pub mod pipeline;
pub mod storage;

pub use database::{ContentDatabase, ContentDatabaseBuilder, DatabaseConfig, DatabaseFetcher};
pub use evaluator::{DocumentEvaluator, RegexCache, filter_documents, matches};
pub use fetcher::ContentQuery;
pub use overlay::{PreviewDelta, load_delta, resolve};
pub use pipeline::{QueryOutput, execute};
pub use storage::{InMemoryStorage, PrefixedStorage};
