//! Convenient re-exports of commonly used types from docquery.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docquery::prelude::*;
//! ```
//!
//! This provides access to:
//! - Conditions, filters and their visitor
//! - Query parameters and the query builder
//! - Backend traits and the content database
//! - Navigation types and error types

pub use docquery_core::{
    backend::{Fetcher, KeyValueStorage, StaticFetcher},
    builder::{QueryBuilder, QueryConfig},
    collation::{CaseFirst, Collator, Sensitivity},
    document::fields,
    error::{QueryError, QueryResult},
    navigation::{NavigationBuilder, NavigationNode, NavigationOptions},
    params::{Projection, QueryParameters, SortDirection, SortKey, Surround, SurroundTarget},
    query::{Condition, ConditionVisitor, Filter, Operator},
};

pub use docquery_memory::{
    ContentDatabase, ContentQuery, DatabaseConfig, InMemoryStorage, PreviewDelta, QueryOutput,
};
