//! An embedded, in-memory document query engine.
//!
//! This crate is the core of the docquery project and provides:
//!
//! - **Document helpers** ([`document`]) - Reserved fields, dotted path resolution and value conversions
//! - **Condition trees** ([`query`]) - MongoDB-like conditions, their document form and a visitor
//! - **Query parameters** ([`params`]) - Frozen snapshots of sort, pagination, projection and surround
//! - **Query builder** ([`builder`]) - Fluent accumulation of parameters with configurable defaults
//! - **Collation** ([`collation`]) - Locale-style string comparison with numeric ordering
//! - **Wire codec** ([`wire`]) - Deterministic, URL-safe encoding and hashing of parameters
//! - **Backend abstraction** ([`backend`]) - Traits for fetchers and key/value storage
//! - **Navigation** ([`navigation`]) - Hierarchical site maps built from document paths
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! Condition evaluation and query execution live in `docquery-memory`.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docquery_core::{builder::QueryBuilder, params::SortKey, query::Filter};
//!
//! let mut builder = QueryBuilder::new();
//! builder
//!     .filter(Filter::is_in("category", vec!["c1", "c3"]))
//!     .filter_document(doc! { "nested.users": { "$contains": "Steve" } })?
//!     .sort(SortKey::asc("title"))
//!     .only(["title", "path"]);
//!
//! let params = builder.params();
//! ```

#[allow(unused_extern_crates)]
extern crate self as docquery_core;

pub mod backend;
pub mod builder;
pub mod collation;
pub mod document;
pub mod error;
pub mod navigation;
pub mod params;
pub mod query;
pub mod wire;
