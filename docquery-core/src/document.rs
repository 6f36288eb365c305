//! Document value helpers.
//!
//! Documents are plain [`bson::Document`] values: ordered mappings whose values may be
//! scalars, nested documents or arrays. This module resolves dotted field paths,
//! exposes the reserved field names, and converts values into the string and type
//! representations the evaluator and the collator work with.
//!
//! # Field paths
//!
//! A field path is a dotted string. Each segment looks up a key in a nested document,
//! or an index when the current value is an array:
//!
//! ```ignore
//! use bson::doc;
//! use docquery_core::document::resolve;
//!
//! let doc = doc! { "nested": { "users": ["Mahatma", "Steve"] } };
//! assert_eq!(resolve(&doc, "nested.users.1").and_then(|v| v.as_str()), Some("Steve"));
//! assert!(resolve(&doc, "nested.users.4").is_none());
//! ```

use bson::{Bson, Document};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{QueryError, QueryResult};

/// Reserved field names with engine-level meaning.
pub mod fields {
    /// Unique identifier within a result set.
    pub const ID: &str = "id";
    /// Slash-delimited hierarchical path, unique per locale.
    pub const PATH: &str = "path";
    /// Locale of the document.
    pub const LOCALE: &str = "locale";
    /// Partial documents are excluded from navigation and default results.
    pub const PARTIAL: &str = "partial";
    /// Opt-out flag for navigation; absent means enabled.
    pub const NAVIGATION_ENABLED: &str = "navigationEnabled";
    /// Per-document navigation overrides (a sub-document).
    pub const NAVIGATION: &str = "navigation";
    /// Draft documents are excluded from navigation.
    pub const DRAFT: &str = "draft";
    /// Deletion marker used by preview deltas.
    pub const DELETED: &str = "deleted";
    /// Human readable title.
    pub const TITLE: &str = "title";
    /// File position, the default ordering key.
    pub const FILE: &str = "file";
    /// Parsed body; for directory metadata documents its fields are merged into the meta.
    pub const BODY: &str = "body";
}

/// Prefix of private (internal) field names.
pub const PRIVATE_PREFIX: char = '_';

/// Resolves a dotted field path against a document.
///
/// Returns `None` when any segment is missing, when an array index is out of range or
/// not a number, or when a scalar is traversed. An empty path resolves to nothing.
pub fn resolve<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Returns the `id` of a document as a string key, if it has one.
///
/// Non-string identifiers are rendered with [`display_string`] so that numeric ids can
/// still be used as storage keys.
pub fn document_id(document: &Document) -> Option<String> {
    match document.get(fields::ID)? {
        Bson::Null | Bson::Undefined => None,
        value => Some(display_string(value)),
    }
}

/// Returns the `path` of a document.
pub fn document_path(document: &Document) -> Option<&str> {
    document.get(fields::PATH).and_then(Bson::as_str)
}

/// Whether a field name denotes a private field.
pub fn is_private(field: &str) -> bool {
    field.starts_with(PRIVATE_PREFIX)
}

/// Returns `true` for values that are null, undefined, or missing.
pub fn is_nullish(value: Option<&Bson>) -> bool {
    matches!(value, None | Some(Bson::Null) | Some(Bson::Undefined))
}

/// Truthiness of a value, used for flag operands such as `$exists: 1`.
pub fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(value) => *value,
        Bson::Int32(value) => *value != 0,
        Bson::Int64(value) => *value != 0,
        Bson::Double(value) => *value != 0.0 && !value.is_nan(),
        Bson::String(value) => !value.is_empty(),
        _ => true,
    }
}

/// Returns the numeric value of a number, normalized to `f64`.
pub fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(value) => Some(*value as f64),
        Bson::Int64(value) => Some(*value as f64),
        Bson::Double(value) => Some(*value),
        _ => None,
    }
}

/// The runtime category of a resolved value, as matched by `$type`.
///
/// One of `string`, `number`, `boolean`, `object` or `undefined`. Arrays, documents,
/// dates and `null` all fall into `object`.
pub fn type_name(value: Option<&Bson>) -> &'static str {
    match value {
        None | Some(Bson::Undefined) => "undefined",
        Some(Bson::String(_)) => "string",
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_)) => "number",
        Some(Bson::Boolean(_)) => "boolean",
        Some(_) => "object",
    }
}

/// Formats a BSON date as an RFC 3339 string with millisecond precision.
pub fn format_date(date: &bson::DateTime) -> String {
    match DateTime::<Utc>::from_timestamp_millis(date.timestamp_millis()) {
        Some(instant) => instant.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => date.timestamp_millis().to_string(),
    }
}

/// Parses an RFC 3339 string into a BSON date.
pub fn parse_date(value: &str) -> Option<bson::DateTime> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|instant| bson::DateTime::from_millis(instant.timestamp_millis()))
}

/// The string representation of a value.
///
/// Strings are returned verbatim, numbers without a trailing `.0`, dates as RFC 3339,
/// arrays as their comma-joined elements. Substring and regex operators test against
/// this form, and the collator falls back to it for mixed types.
pub fn display_string(value: &Bson) -> String {
    match value {
        Bson::String(value) => value.clone(),
        Bson::Int32(value) => value.to_string(),
        Bson::Int64(value) => value.to_string(),
        Bson::Double(value) => value.to_string(),
        Bson::Boolean(value) => value.to_string(),
        Bson::Null => "null".to_string(),
        Bson::Undefined => "undefined".to_string(),
        Bson::DateTime(value) => format_date(value),
        Bson::Array(items) => items
            .iter()
            .map(|item| match item {
                Bson::Null | Bson::Undefined => String::new(),
                item => display_string(item),
            })
            .collect::<Vec<_>>()
            .join(","),
        Bson::Document(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}

/// Converts a JSON object into a document.
///
/// # Errors
///
/// Returns [`QueryError::Serialization`] when the value is not an object or holds
/// numbers BSON cannot represent.
pub fn from_json(value: Value) -> QueryResult<Document> {
    if !value.is_object() {
        return Err(QueryError::Serialization(format!(
            "expected a JSON object, found {}",
            value
        )));
    }

    Ok(bson::ser::serialize_to_document(&value)?)
}

/// Converts a document into a JSON object.
///
/// # Errors
///
/// Returns [`QueryError::Serialization`] if the document cannot be represented as JSON.
pub fn to_json(document: &Document) -> QueryResult<Value> {
    Ok(bson::de::deserialize_from_document(document.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn item() -> Document {
        doc! {
            "id": 1,
            "name": "a",
            "nested": { "users": ["Mahatma", "Steve", "Woodrow"], "meta": { "depth": 2 } },
            "list": [{ "b": "first" }, { "b": "second" }],
        }
    }

    #[test]
    fn test_resolve_nested_paths() {
        let doc = item();

        assert_eq!(resolve(&doc, "name"), Some(&Bson::String("a".into())));
        assert_eq!(resolve(&doc, "nested.users.0").and_then(Bson::as_str), Some("Mahatma"));
        assert_eq!(resolve(&doc, "nested.meta.depth"), Some(&Bson::Int32(2)));
        assert_eq!(resolve(&doc, "list.1.b").and_then(Bson::as_str), Some("second"));
    }

    #[test]
    fn test_resolve_absent_paths() {
        let doc = item();

        assert!(resolve(&doc, "title").is_none());
        assert!(resolve(&doc, "nested.users.4").is_none());
        assert!(resolve(&doc, "nested.users.first").is_none());
        assert!(resolve(&doc, "name.length").is_none());
        assert!(resolve(&doc, "").is_none());
    }

    #[test]
    fn test_type_names() {
        let doc = item();

        assert_eq!(type_name(resolve(&doc, "name")), "string");
        assert_eq!(type_name(resolve(&doc, "id")), "number");
        assert_eq!(type_name(resolve(&doc, "nested")), "object");
        assert_eq!(type_name(resolve(&doc, "nested.users")), "object");
        assert_eq!(type_name(resolve(&doc, "missing")), "undefined");
        assert_eq!(type_name(Some(&Bson::Null)), "object");
        assert_eq!(type_name(Some(&Bson::Boolean(true))), "boolean");
    }

    #[test]
    fn test_display_string() {
        assert_eq!(display_string(&Bson::Double(1.0)), "1");
        assert_eq!(display_string(&Bson::Double(1.5)), "1.5");
        assert_eq!(display_string(&Bson::Int64(42)), "42");
        assert_eq!(display_string(&Bson::String("plain".into())), "plain");
        assert_eq!(
            display_string(&Bson::Array(vec![Bson::Int32(1), Bson::Null, Bson::String("x".into())])),
            "1,,x"
        );
        assert_eq!(
            display_string(&Bson::DateTime(bson::DateTime::from_millis(0))),
            "1970-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("2022-01-01T00:00:00.001Z").unwrap();
        assert_eq!(date.timestamp_millis(), 1_640_995_200_001);
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn test_json_conversion() {
        let doc = from_json(json!({ "id": "a", "count": 3, "tags": ["x"], "meta": { "ok": true } })).unwrap();

        assert_eq!(document_id(&doc).as_deref(), Some("a"));
        assert_eq!(doc.get("count").and_then(as_number), Some(3.0));
        assert_eq!(resolve(&doc, "meta.ok"), Some(&Bson::Boolean(true)));

        let back = to_json(&doc).unwrap();
        assert_eq!(back["tags"][0], json!("x"));
        assert!(from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_numeric_ids_are_rendered_as_keys() {
        assert_eq!(document_id(&doc! { "id": 3 }).as_deref(), Some("3"));
        assert_eq!(document_id(&doc! { "id": Bson::Null }), None);
        assert_eq!(document_id(&doc! {}), None);
    }
}
