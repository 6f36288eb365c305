//! Error types and result types for query operations.
//!
//! This module provides error handling for condition parsing, evaluation, parameter
//! decoding, fetching and storage access. Use [`QueryResult<T>`] as the return type
//! for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur while building or running a query.
///
/// A missing field is never an error: operators treat it as "absent" and decide
/// for themselves whether an absent value matches.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Serialization/deserialization error when converting between formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A condition tree could not be parsed from its document form.
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),
    /// A `$regex` pattern failed to compile while a condition was evaluated.
    #[error("Invalid regex {pattern:?} on field {field:?}: {message}")]
    InvalidRegex {
        /// The field the offending condition was attached to.
        field: String,
        /// The pattern as written in the condition.
        pattern: String,
        /// The compiler's description of the problem.
        message: String,
    },
    /// Query parameters are malformed (usually while decoding the wire form).
    #[error("Invalid query parameters: {0}")]
    InvalidParameters(String),
    /// The fetcher failed to retrieve documents.
    #[error("Fetch error: {0}")]
    Fetch(String),
    /// The fetcher could not find the requested resource.
    #[error("Not found: {0}")]
    NotFound(String),
    /// An error occurred in the underlying key/value storage.
    #[error("Storage error: {0}")]
    Storage(String),
    /// The content database could not be initialized.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

/// A specialized `Result` type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

impl From<BsonError> for QueryError {
    fn from(err: BsonError) -> Self {
        QueryError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for QueryError {
    fn from(err: SerdeJsonError) -> Self {
        QueryError::Serialization(err.to_string())
    }
}
