//! Compact, URL-safe encoding of query parameters.
//!
//! Parameters travel to remote fetchers as the BSON bytes of
//! [`QueryParameters::to_document`], encoded with unpadded URL-safe base64. The
//! SHA-256 of those bytes identifies a query, and [`cache_key`] pairs it with the
//! content integrity so cached responses expire when the content changes.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

use crate::{
    error::{QueryError, QueryResult},
    params::QueryParameters,
};

fn to_bytes(params: &QueryParameters) -> QueryResult<Vec<u8>> {
    Ok(bson::ser::serialize_to_vec(&params.to_document())?)
}

/// Encodes parameters into a URL-safe string.
pub fn encode(params: &QueryParameters) -> QueryResult<String> {
    Ok(URL_SAFE_NO_PAD.encode(to_bytes(params)?))
}

/// Decodes parameters produced by [`encode`].
///
/// # Errors
///
/// Returns [`QueryError::InvalidParameters`] when the input is not valid base64, and
/// the errors of [`QueryParameters::from_document`] for malformed contents.
pub fn decode(encoded: &str) -> QueryResult<QueryParameters> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|err| QueryError::InvalidParameters(err.to_string()))?;
    let document: bson::Document = bson::de::deserialize_from_slice(&bytes)?;

    QueryParameters::from_document(&document)
}

/// Hex SHA-256 digest identifying the parameters.
pub fn hash(params: &QueryParameters) -> QueryResult<String> {
    let mut hasher = Sha256::new();
    hasher.update(to_bytes(params)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Cache key of a query against a given content integrity.
pub fn cache_key(params: &QueryParameters, integrity: u64) -> QueryResult<String> {
    Ok(format!("{}.{}", hash(params)?, integrity))
}
