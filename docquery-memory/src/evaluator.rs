//! Condition evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for condition trees, enabling
//! filtering and comparison operations on BSON documents. Leaf operators are
//! dispatched through [`OPERATORS`], a table from [`Operator`] to its evaluation
//! function.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime};
use log::trace;
use regex::{Regex, RegexBuilder};

use docquery_core::{
    document::{display_string, is_nullish, is_truthy, parse_date, resolve, type_name},
    error::{QueryError, QueryResult},
    query::{Condition, ConditionVisitor, Operator},
};

/// Type-erased, comparable representation of BSON values.
///
/// This enum wraps BSON values and provides comparison operations for
/// filtering queries. It normalizes numeric types to f64 for easy comparison.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Undefined value
    Undefined,
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any other BSON value, compared as-is
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Undefined => Comparable::Undefined,
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect::<Vec<_>>()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Undefined, Comparable::Undefined) => true,
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::String(b)) => {
                parse_date(b).and_then(|b| a.partial_cmp(&b))
            }
            (Comparable::String(a), Comparable::DateTime(b)) => {
                parse_date(a).and_then(|a| a.partial_cmp(b))
            }
            _ => None,
        }
    }
}

/// Strict equality of a resolved field and an operand. An absent field only
/// equals an undefined operand.
fn values_equal(field: Option<&Bson>, operand: &Bson) -> bool {
    match field {
        Some(value) => Comparable::from(value) == Comparable::from(operand),
        None => matches!(operand, Bson::Undefined),
    }
}

fn array_contains(items: &[Bson], needle: &Bson) -> bool {
    let needle = Comparable::from(needle);
    items.iter().any(|item| Comparable::from(item) == needle)
}

/// The candidates of an operand that may be a single value or an array.
fn candidates(operand: &Bson) -> &[Bson] {
    match operand {
        Bson::Array(items) => items,
        single => std::slice::from_ref(single),
    }
}

/// Compiled regular expressions, shared across the documents of one filter pass.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: HashMap<String, Regex>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled form of `pattern`, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidRegex`] when the pattern does not compile.
    pub fn get(&mut self, field: &str, pattern: &str) -> QueryResult<&Regex> {
        if !self.compiled.contains_key(pattern) {
            let regex = compile(pattern).map_err(|err| QueryError::InvalidRegex {
                field: field.to_string(),
                pattern: pattern.to_string(),
                message: err.to_string(),
            })?;
            trace!("compiled regex {} for field {}", pattern, field);
            self.compiled.insert(pattern.to_string(), regex);
        }

        self.compiled
            .get(pattern)
            .ok_or_else(|| QueryError::InvalidRegex {
                field: field.to_string(),
                pattern: pattern.to_string(),
                message: "pattern missing from cache".to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Flags recognised after the closing slash of a `/pattern/flags` literal.
const REGEX_FLAGS: &str = "imsxgydul";

/// Splits a `/pattern/flags` literal; anything else is a bare pattern.
fn split_pattern(pattern: &str) -> (&str, &str) {
    if let Some(rest) = pattern.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let flags = &rest[end + 1..];
            if flags.chars().all(|flag| REGEX_FLAGS.contains(flag)) {
                return (&rest[..end], flags);
            }
        }
    }

    (pattern, "")
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let (source, flags) = split_pattern(pattern);

    RegexBuilder::new(source)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
}

/// Evaluation function of a leaf operator: `(regexes, field, value, operand)`.
pub(crate) type OperatorFn = fn(&mut RegexCache, &str, Option<&Bson>, &Bson) -> QueryResult<bool>;

/// Leaf operators and the functions evaluating them.
pub(crate) const OPERATORS: [(Operator, OperatorFn); 13] = [
    (Operator::Eq, op_eq),
    (Operator::Ne, op_ne),
    (Operator::Gt, op_gt),
    (Operator::Gte, op_gte),
    (Operator::Lt, op_lt),
    (Operator::Lte, op_lte),
    (Operator::In, op_in),
    (Operator::Contains, op_contains),
    (Operator::IContains, op_icontains),
    (Operator::ContainsAny, op_contains_any),
    (Operator::Exists, op_exists),
    (Operator::Type, op_type),
    (Operator::Regex, op_regex),
];

fn operator_fn(op: Operator) -> QueryResult<OperatorFn> {
    OPERATORS
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, function)| *function)
        .ok_or_else(|| QueryError::InvalidCondition(format!("unsupported operator {}", op.key())))
}

fn op_eq(regexes: &mut RegexCache, field: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    match operand {
        Bson::RegularExpression(_) => op_regex(regexes, field, value, operand),
        _ => Ok(values_equal(value, operand)),
    }
}

fn op_ne(regexes: &mut RegexCache, field: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    Ok(!op_eq(regexes, field, value, operand)?)
}

fn compare(value: Option<&Bson>, operand: &Bson) -> Option<Ordering> {
    Comparable::from(value?).partial_cmp(&Comparable::from(operand))
}

fn op_gt(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    Ok(compare(value, operand) == Some(Ordering::Greater))
}

fn op_gte(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    Ok(matches!(compare(value, operand), Some(Ordering::Greater | Ordering::Equal)))
}

fn op_lt(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    Ok(compare(value, operand) == Some(Ordering::Less))
}

fn op_lte(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    Ok(matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal)))
}

fn op_in(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    Ok(candidates(operand).iter().any(|candidate| match value {
        Some(Bson::Array(items)) => {
            array_contains(items, candidate) || values_equal(value, candidate)
        }
        _ => values_equal(value, candidate),
    }))
}

fn op_contains(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    match value {
        None => Ok(false),
        Some(Bson::Array(items)) => {
            if is_nullish(Some(operand)) {
                return Ok(true);
            }
            Ok(candidates(operand).iter().any(|candidate| array_contains(items, candidate)))
        }
        Some(value) => {
            let haystack = display_string(value);
            Ok(candidates(operand)
                .iter()
                .any(|needle| haystack.contains(&display_string(needle))))
        }
    }
}

fn op_icontains(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    let Some(value) = value else {
        return Ok(false);
    };

    let haystack = display_string(value).to_lowercase();
    Ok(candidates(operand)
        .iter()
        .any(|needle| haystack.contains(&display_string(needle).to_lowercase())))
}

fn op_contains_any(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    match value {
        None => Ok(false),
        Some(Bson::Array(items)) => {
            Ok(candidates(operand).iter().any(|candidate| array_contains(items, candidate)))
        }
        Some(value) => {
            let haystack = display_string(value);
            Ok(candidates(operand)
                .iter()
                .any(|needle| haystack.contains(&display_string(needle))))
        }
    }
}

fn op_exists(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    Ok(value.is_some() == is_truthy(operand))
}

fn op_type(_: &mut RegexCache, _: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    Ok(operand.as_str() == Some(type_name(value)))
}

fn op_regex(regexes: &mut RegexCache, field: &str, value: Option<&Bson>, operand: &Bson) -> QueryResult<bool> {
    let pattern = match operand {
        Bson::String(pattern) => pattern.clone(),
        Bson::RegularExpression(regex) => regex.to_string(),
        other => {
            return Err(QueryError::InvalidRegex {
                field: field.to_string(),
                pattern: other.to_string(),
                message: "expected a pattern string".to_string(),
            });
        }
    };

    let text = match value {
        Some(value) if !is_nullish(Some(value)) => display_string(value),
        _ => String::new(),
    };

    Ok(regexes.get(field, &pattern)?.is_match(&text))
}

/// Evaluates condition trees against a single document.
pub struct DocumentEvaluator<'a> {
    document: &'a Document,
    regexes: &'a mut RegexCache,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document, regexes: &'a mut RegexCache) -> Self {
        Self { document, regexes }
    }

    pub fn evaluate(&mut self, condition: &Condition) -> QueryResult<bool> {
        self.visit_condition(condition)
    }

    /// Whether every condition matches.
    pub fn evaluate_all(&mut self, conditions: &[Condition]) -> QueryResult<bool> {
        self.visit_and(conditions)
    }
}

impl<'a> ConditionVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = QueryError;

    fn visit_and(&mut self, children: &[Condition]) -> Result<Self::Output, Self::Error> {
        for child in children {
            if !self.visit_condition(child)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, children: &[Condition]) -> Result<Self::Output, Self::Error> {
        for child in children {
            if self.visit_condition(child)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, child: &Condition) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_condition(child)?)
    }

    fn visit_leaf(
        &mut self,
        field: &str,
        op: Operator,
        operand: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let function = operator_fn(op)?;
        function(self.regexes, field, resolve(self.document, field), operand)
    }
}

/// Whether `document` matches `condition`.
///
/// # Errors
///
/// Returns [`QueryError::InvalidRegex`] when a `$regex` pattern does not compile.
pub fn matches(document: &Document, condition: &Condition) -> QueryResult<bool> {
    let mut regexes = RegexCache::new();
    DocumentEvaluator::new(document, &mut regexes).evaluate(condition)
}

/// Keeps the documents matching every condition, in input order.
pub fn filter_documents(documents: Vec<Document>, conditions: &[Condition]) -> QueryResult<Vec<Document>> {
    let mut regexes = RegexCache::new();
    filter_documents_with(documents, conditions, &mut regexes)
}

/// Like [`filter_documents`], reusing compiled patterns from `regexes`.
pub fn filter_documents_with(
    documents: Vec<Document>,
    conditions: &[Condition],
    regexes: &mut RegexCache,
) -> QueryResult<Vec<Document>> {
    if conditions.is_empty() {
        return Ok(documents);
    }

    let mut kept = Vec::with_capacity(documents.len());
    for document in documents {
        if DocumentEvaluator::new(&document, regexes).evaluate_all(conditions)? {
            kept.push(document);
        }
    }

    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docquery_core::query::Filter;
    use pretty_assertions::assert_eq;

    fn item() -> Document {
        doc! {
            "id": 1,
            "name": "a",
            "to": "a",
            "live": true,
            "category": "c1",
            "nested": { "users": ["Mahatma", "Steve", "Woodrow"] },
        }
    }

    fn check(document: &Document, condition: Document) -> bool {
        matches(document, &Condition::parse(condition).unwrap()).unwrap()
    }

    #[test]
    fn test_contains_string() {
        let item = item();

        assert!(check(&item, doc! { "name": { "$contains": "a" } }));
        assert!(check(&item, doc! { "nested.users.0": { "$contains": "Maha" } }));
        assert!(!check(&item, doc! { "nested.users.0": { "$contains": "maha" } }));
        assert!(check(&item, doc! { "nested.users.0": { "$contains": ["Maha", "tma"] } }));
        assert!(check(&item, doc! { "nested.users.0": { "$contains": ["John", "tma"] } }));
    }

    #[test]
    fn test_contains_strict_membership() {
        let values = doc! { "values": [0, false, ""] };

        assert!(check(&values, doc! { "values": { "$contains": "" } }));
        assert!(check(&values, doc! { "values": { "$contains": 0 } }));
        assert!(check(&values, doc! { "values": { "$contains": false } }));
        assert!(!check(&values, doc! { "values": { "$contains": "0" } }));
    }

    #[test]
    fn test_icontains() {
        let item = item();

        assert!(check(&item, doc! { "nested.users.1": { "$icontains": "steve" } }));
        assert!(check(&item, doc! { "nested.users.2": { "$icontains": "WOODROW" } }));
        assert!(!check(&item, doc! { "nested.users.2": { "$icontains": "john" } }));
    }

    #[test]
    fn test_contains_array() {
        let item = item();

        assert!(check(&item, doc! { "nested.users": { "$contains": "Steve" } }));
        assert!(check(&item, doc! { "nested.users": { "$contains": ["Woodrow", "Steve"] } }));
        assert!(check(&item, doc! { "nested.users": { "$contains": ["John", "Steve"] } }));
        assert!(!check(&item, doc! { "nested.users": { "$contains": ["John", "Paul"] } }));
        assert!(!check(&item, doc! { "nested.users": { "$contains": "" } }));
        assert!(!check(&item, doc! { "nested.users": { "$contains": 0 } }));
        assert!(!check(&item, doc! { "nested.users": { "$contains": false } }));
    }

    #[test]
    fn test_contains_nullish_operand_matches_any_array() {
        let item = item();

        assert!(check(&item, doc! { "nested.users": { "$contains": Bson::Null } }));
        assert!(check(&item, doc! { "nested.users": { "$contains": Bson::Undefined } }));
        assert!(!check(&item, doc! { "missing": { "$contains": Bson::Null } }));
    }

    #[test]
    fn test_contains_any() {
        let item = item();

        assert!(check(&item, doc! { "nested.users": { "$containsAny": ["Steve", "Woodrow"] } }));
        assert!(check(&item, doc! { "nested.users": { "$containsAny": ["John", "Paul", "Steve"] } }));
        assert!(!check(&item, doc! { "nested.users": { "$containsAny": ["John", "Paul"] } }));
    }

    #[test]
    fn test_exists() {
        let item = item();

        assert!(check(&item, doc! { "name": { "$exists": true } }));
        assert!(!check(&item, doc! { "title": { "$exists": true } }));
        assert!(check(&item, doc! { "title": { "$exists": false } }));
        assert!(check(&item, doc! { "nested.users.1": { "$exists": true } }));
        assert!(check(&item, doc! { "nested.users.4": { "$exists": false } }));
        assert!(check(&doc! { "title": Bson::Null }, doc! { "title": { "$exists": true } }));
    }

    #[test]
    fn test_type() {
        let item = item();

        assert!(check(&item, doc! { "name": { "$type": "string" } }));
        assert!(!check(&item, doc! { "name": { "$type": "number" } }));
        assert!(check(&item, doc! { "title": { "$type": "undefined" } }));
        assert!(check(&item, doc! { "nested": { "$type": "object" } }));
        assert!(check(&item, doc! { "nested.users": { "$type": "object" } }));
        assert!(check(&item, doc! { "nested.users.0": { "$type": "string" } }));
    }

    #[test]
    fn test_eq_is_strict() {
        let item = item();

        assert!(check(&item, doc! { "name": { "$eq": "a" } }));
        assert!(!check(&item, doc! { "name": { "$eq": "A" } }));
        assert!(check(&item, doc! { "id": { "$eq": 1 } }));
        assert!(check(&item, doc! { "id": { "$eq": 1.0 } }));
        assert!(!check(&item, doc! { "id": { "$eq": "1" } }));
        assert!(check(&item, doc! { "live": { "$eq": true } }));
        assert!(!check(&item, doc! { "live": { "$eq": "true" } }));
        assert!(!check(&item, doc! { "title": Bson::Null }));
    }

    #[test]
    fn test_ne() {
        let item = item();

        assert!(!check(&item, doc! { "name": { "$ne": "a" } }));
        assert!(check(&item, doc! { "name": { "$ne": "A" } }));
        assert!(check(&item, doc! { "id": { "$ne": "1" } }));
        assert!(!check(&item, doc! { "live": { "$ne": true } }));
        assert!(check(&item, doc! { "draft": { "$ne": true } }));
    }

    #[test]
    fn test_logical_operators() {
        let item = item();

        assert!(!check(&item, doc! { "$not": { "live": true } }));
        assert!(!check(&item, doc! { "live": { "$not": true } }));
        assert!(!check(&item, doc! { "live": { "$not": { "$eq": true } } }));
        assert!(check(&item, doc! { "$and": [{ "name": "a" }, { "live": true }] }));
        assert!(!check(&item, doc! { "$and": [{ "name": "a" }, { "live": false }] }));
        assert!(check(&item, doc! { "$or": [{ "name": "b" }, { "live": true }] }));
        assert!(!check(&item, doc! { "$or": [{ "name": "b" }, { "live": false }] }));
    }

    #[test]
    fn test_empty_combinators() {
        let item = item();

        assert!(matches(&item, &Condition::And(vec![])).unwrap());
        assert!(!matches(&item, &Condition::Or(vec![])).unwrap());
    }

    #[test]
    fn test_regex() {
        let item = item();
        let sensitive = Regex::new("maha").unwrap();
        let insensitive = Regex::new("(?i)maha").unwrap();

        assert!(!matches(&item, &Filter::regex("nested.users.0", &sensitive)).unwrap());
        assert!(!check(&item, doc! { "nested.users.0": { "$regex": "/maha/" } }));
        assert!(!check(&item, doc! { "nested.users.0": { "$regex": "maha" } }));

        assert!(!check(&item, doc! { "nested.users.0": "/maha/i" }));
        assert!(matches(&item, &Filter::regex("nested.users.0", &insensitive)).unwrap());
        assert!(check(&item, doc! { "nested.users.0": { "$regex": "/maha/i" } }));

        assert!(!matches(&item, &Filter::regex("nested.users.0", &insensitive).not()).unwrap());
        assert!(matches(&item, &Filter::regex("nested.users.0", &sensitive).not()).unwrap());
        assert!(!check(&item, doc! { "nested.users.0": { "$not": { "$regex": "/maha/i" } } }));
    }

    #[test]
    fn test_native_regex_filter() {
        let regex = Regex::new("(?i)^steve$").unwrap();
        assert!(matches(&item(), &Filter::regex("nested.users.1", &regex)).unwrap());
    }

    #[test]
    fn test_regex_on_absent_field_tests_empty_string() {
        assert!(matches(&item(), &Filter::pattern("title", "^$")).unwrap());
        assert!(!matches(&item(), &Filter::pattern("title", ".")).unwrap());
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let result = matches(&item(), &Filter::pattern("name", "/(unclosed/"));

        match result {
            Err(QueryError::InvalidRegex { field, pattern, .. }) => {
                assert_eq!(field, "name");
                assert_eq!(pattern, "/(unclosed/");
            }
            other => panic!("expected an invalid regex error, got {:?}", other),
        }
    }

    #[test]
    fn test_split_pattern() {
        assert_eq!(split_pattern("/maha/i"), ("maha", "i"));
        assert_eq!(split_pattern("/^/blog/"), ("^/blog", ""));
        assert_eq!(split_pattern("/blog"), ("/blog", ""));
        assert_eq!(split_pattern("/a/b/zz"), ("/a/b/zz", ""));
        assert_eq!(split_pattern("maha"), ("maha", ""));
    }

    #[test]
    fn test_numerical_operators() {
        let item = item();

        assert!(check(&item, doc! { "id": { "$gt": 0 } }));
        assert!(!check(&item, doc! { "id": { "$gt": 1 } }));
        assert!(check(&item, doc! { "id": { "$gte": 1 } }));
        assert!(!check(&item, doc! { "id": { "$gte": 2 } }));
        assert!(check(&item, doc! { "id": { "$lt": 2 } }));
        assert!(!check(&item, doc! { "id": { "$lt": 1 } }));
        assert!(check(&item, doc! { "id": { "$lte": 1 } }));
        assert!(!check(&item, doc! { "id": { "$lte": 0 } }));
        assert!(!check(&item, doc! { "missing": { "$lt": 10 } }));
        assert!(!check(&item, doc! { "name": { "$lt": 10 } }));
    }

    #[test]
    fn test_date_comparisons() {
        let document = doc! { "date": bson::DateTime::from_millis(1_640_995_200_000) };

        assert!(check(&document, doc! { "date": { "$gt": "2021-12-31T00:00:00.000Z" } }));
        assert!(check(&document, doc! { "date": { "$lte": bson::DateTime::from_millis(1_640_995_200_000) } }));
        assert!(!check(&document, doc! { "date": { "$lt": "not a date" } }));
    }

    #[test]
    fn test_in_string_field() {
        let item = item();

        assert!(check(&item, doc! { "name": { "$in": ["a", "b"] } }));
        assert!(check(&item, doc! { "category": { "$in": "c1" } }));
        assert!(check(&item, doc! { "category": { "$in": ["c1", "c2"] } }));
        assert!(!check(&item, doc! { "category": { "$in": ["c2", "c3"] } }));
        assert!(check(&item, doc! { "id": { "$in": [1, 2] } }));
    }

    #[test]
    fn test_in_array_field() {
        let data = vec![
            doc! { "name": "post1", "tags": ["school", "office"] },
            doc! { "name": "post2", "tags": ["school", "home"] },
            doc! { "item": "Maps", "tags": ["office", "storage"] },
        ];
        let condition = Filter::is_in("tags", vec!["school", "home"]);

        let names = filter_documents(data, &[condition])
            .unwrap()
            .iter()
            .map(|doc| doc.get_str("name").unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["post1", "post2"]);
    }

    #[test]
    fn test_eq_reflexive_on_own_values() {
        let item = item();

        for (field, value) in &item {
            assert!(matches(&item, &Filter::eq(field.as_str(), value.clone())).unwrap(), "{}", field);
        }
    }

    #[test]
    fn test_filter_pass_reuses_compiled_patterns() {
        let documents = vec![item(), item(), item()];
        let mut regexes = RegexCache::new();

        let kept = filter_documents_with(documents, &[Filter::pattern("name", "/A/i")], &mut regexes).unwrap();
        assert_eq!(kept.len(), 3);
        assert_eq!(regexes.len(), 1);
    }
}
