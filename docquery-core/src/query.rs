//! Condition trees for filtering documents.
//!
//! A [`Condition`] is a closed, recursive predicate: either a leaf testing one field
//! with one [`Operator`], or an `And`/`Or`/`Not` combinator over nested conditions.
//!
//! # Document form
//!
//! Conditions are usually written in their MongoDB-like document form and parsed:
//!
//! ```ignore
//! use bson::doc;
//! use docquery_core::query::Condition;
//!
//! let condition = Condition::parse(doc! {
//!     "category": { "$in": ["c1", "c3"] },
//!     "nested.users": { "$contains": "Steve" },
//!     "$or": [{ "draft": false }, { "draft": { "$exists": false } }],
//! })?;
//! ```
//!
//! The parser accepts the usual sugar:
//!
//! - a mapping is the implicit AND of its entries,
//! - a scalar or array value is an `$eq` leaf,
//! - a nested mapping without `$` keys is scoped under its field (`{a: {b: 1}}` is `{"a.b": 1}`),
//! - a regular expression value is a `$regex` leaf,
//! - `$not` wraps either an operator mapping or a plain value.
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct builds leaves directly, without going through the document form:
//!
//! ```ignore
//! use docquery_core::query::Filter;
//!
//! let condition = Filter::eq("name", "a").and(Filter::gt("id", 0));
//! ```

use std::convert::Infallible;

use bson::{Bson, Document};
use regex::Regex;

use crate::error::{QueryError, QueryResult};

/// Leaf operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Strict equality, no type coercion.
    Eq,
    /// Negation of [`Operator::Eq`].
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Field equals, or array field contains, any of the candidates.
    In,
    /// Substring (string field) or membership (array field), any-of.
    Contains,
    /// Case-insensitive substring test, any-of.
    IContains,
    /// Any candidate appears in the field.
    ContainsAny,
    /// Field is present (or absent).
    Exists,
    /// Runtime category of the field.
    Type,
    /// Regular expression test on the field's string form.
    Regex,
}

impl Operator {
    /// All leaf operators.
    pub const ALL: [Operator; 13] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::In,
        Operator::Contains,
        Operator::IContains,
        Operator::ContainsAny,
        Operator::Exists,
        Operator::Type,
        Operator::Regex,
    ];

    /// Returns the `$`-prefixed key of this operator.
    pub fn key(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::In => "$in",
            Operator::Contains => "$contains",
            Operator::IContains => "$icontains",
            Operator::ContainsAny => "$containsAny",
            Operator::Exists => "$exists",
            Operator::Type => "$type",
            Operator::Regex => "$regex",
        }
    }

    /// Looks up an operator by its `$`-prefixed key.
    pub fn from_key(key: &str) -> Option<Self> {
        Operator::ALL.into_iter().find(|op| op.key() == key)
    }
}

/// A recursive boolean predicate over a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// All children must match. An empty list matches everything.
    And(Vec<Condition>),
    /// At least one child must match. An empty list matches nothing.
    Or(Vec<Condition>),
    /// Inverts the child.
    Not(Box<Condition>),
    /// Tests a single field.
    Leaf {
        /// Dotted path of the tested field.
        field: String,
        /// The operator applied to the field.
        op: Operator,
        /// The value the field is tested against.
        operand: Bson,
    },
}

impl Condition {
    /// Creates a leaf condition.
    pub fn leaf(field: impl Into<String>, op: Operator, operand: impl Into<Bson>) -> Self {
        Condition::Leaf {
            field: field.into(),
            op,
            operand: operand.into(),
        }
    }

    /// Combines this condition with another using logical AND.
    ///
    /// If this condition is already an AND, the other condition is appended
    /// to the list. Otherwise, a new AND condition is created.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut list) => {
                list.push(other);
                Condition::And(list)
            }
            _ => Condition::And(vec![self, other]),
        }
    }

    /// Combines this condition with another using logical OR.
    ///
    /// If this condition is already an OR, the other condition is appended
    /// to the list. Otherwise, a new OR condition is created.
    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut list) => {
                list.push(other);
                Condition::Or(list)
            }
            _ => Condition::Or(vec![self, other]),
        }
    }

    /// Negates this condition (logical NOT).
    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }

    /// Parses a condition from its document form.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidCondition`] for unknown operators, operators used
    /// outside a field, and operands of the wrong shape.
    pub fn parse(document: Document) -> QueryResult<Self> {
        parse_document(document, None)
    }

    /// Parses a condition from any BSON value; only documents are accepted.
    pub fn from_bson(value: Bson) -> QueryResult<Self> {
        match value {
            Bson::Document(document) => Condition::parse(document),
            other => Err(QueryError::InvalidCondition(format!(
                "expected a condition document, found {}",
                other
            ))),
        }
    }

    /// Returns the document form of this condition.
    ///
    /// Parsing the result yields a condition equal to `self`.
    pub fn to_document(&self) -> Document {
        match ConditionEncoder.visit_condition(self) {
            Ok(Bson::Document(document)) => document,
            Ok(other) => {
                let mut document = Document::new();
                document.insert("$match", other);
                document
            }
            Err(never) => match never {},
        }
    }

    /// Whether a top-level clause of this condition tests `field`.
    ///
    /// Looks through implicit ANDs but not into `Or` or `Not`.
    pub fn constrains(&self, field: &str) -> bool {
        match self {
            Condition::Leaf { field: own, .. } => own == field,
            Condition::And(children) => children.iter().any(|child| child.constrains(field)),
            Condition::Or(_) | Condition::Not(_) => false,
        }
    }
}

impl TryFrom<Document> for Condition {
    type Error = QueryError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        Condition::parse(document)
    }
}

fn join_field(scope: Option<&str>, key: &str) -> String {
    match scope {
        Some(scope) => format!("{}.{}", scope, key),
        None => key.to_string(),
    }
}

fn has_operator_keys(document: &Document) -> bool {
    document.keys().any(|key| key.starts_with('$'))
}

fn collapse(mut children: Vec<Condition>) -> Condition {
    if children.len() == 1 {
        children.remove(0)
    } else {
        Condition::And(children)
    }
}

fn parse_document(document: Document, scope: Option<&str>) -> QueryResult<Condition> {
    let mut children = Vec::with_capacity(document.len());

    for (key, value) in document {
        if key.starts_with('$') {
            children.push(parse_operator(&key, value, scope)?);
        } else {
            let field = join_field(scope, &key);
            children.push(parse_value(value, &field)?);
        }
    }

    Ok(collapse(children))
}

fn parse_value(value: Bson, field: &str) -> QueryResult<Condition> {
    match value {
        Bson::Document(document) => parse_document(document, Some(field)),
        Bson::RegularExpression(regex) => Ok(Condition::leaf(field, Operator::Regex, regex.to_string())),
        other => Ok(Condition::leaf(field, Operator::Eq, other)),
    }
}

fn parse_children(key: &str, value: Bson, scope: Option<&str>) -> QueryResult<Vec<Condition>> {
    let Bson::Array(items) = value else {
        return Err(QueryError::InvalidCondition(format!("{} expects an array", key)));
    };

    items
        .into_iter()
        .map(|item| parse_nested(item, scope))
        .collect()
}

fn parse_nested(value: Bson, scope: Option<&str>) -> QueryResult<Condition> {
    match (value, scope) {
        (Bson::Document(document), scope) => parse_document(document, scope),
        (value, Some(field)) => parse_value(value, field),
        (value, None) => Err(QueryError::InvalidCondition(format!(
            "expected a condition document, found {}",
            value
        ))),
    }
}

fn parse_operator(key: &str, value: Bson, scope: Option<&str>) -> QueryResult<Condition> {
    match key {
        "$and" => Ok(Condition::And(parse_children(key, value, scope)?)),
        "$or" => Ok(Condition::Or(parse_children(key, value, scope)?)),
        "$not" => Ok(parse_nested(value, scope)?.not()),
        "$match" => parse_nested(value, scope),
        _ => {
            let op = Operator::from_key(key)
                .ok_or_else(|| QueryError::InvalidCondition(format!("unknown operator {}", key)))?;
            let field = scope.ok_or_else(|| {
                QueryError::InvalidCondition(format!("operator {} must be applied to a field", key))
            })?;

            validate_operand(op, &value)?;

            let operand = match (op, value) {
                (Operator::Regex, Bson::RegularExpression(regex)) => Bson::String(regex.to_string()),
                (_, value) => value,
            };

            Ok(Condition::leaf(field, op, operand))
        }
    }
}

fn validate_operand(op: Operator, operand: &Bson) -> QueryResult<()> {
    match (op, operand) {
        (Operator::ContainsAny, Bson::Array(_)) => Ok(()),
        (Operator::ContainsAny, _) => Err(QueryError::InvalidCondition(
            "$containsAny expects an array".to_string(),
        )),
        (Operator::IContains, Bson::String(_)) => Ok(()),
        (Operator::IContains, Bson::Array(items)) if items.iter().all(|item| item.as_str().is_some()) => Ok(()),
        (Operator::IContains, _) => Err(QueryError::InvalidCondition(
            "$icontains expects a string or an array of strings".to_string(),
        )),
        (Operator::Regex, Bson::String(_) | Bson::RegularExpression(_)) => Ok(()),
        (Operator::Regex, _) => Err(QueryError::InvalidCondition(
            "$regex expects a pattern string".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Helper struct for constructing leaf conditions.
///
/// All methods accept field names as `Into<String>` and values as `Into<Bson>`.
///
/// # Example
///
/// ```ignore
/// use docquery_core::query::Filter;
///
/// let condition = Filter::eq("name", "Alice")
///     .and(Filter::gt("age", 18));
/// ```
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Condition {
        Condition::leaf(field, Operator::Eq, value)
    }

    /// Matches documents where the field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Condition {
        Condition::leaf(field, Operator::Ne, value)
    }

    /// Matches documents where the field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Condition {
        Condition::leaf(field, Operator::Gt, value)
    }

    /// Matches documents where the field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Condition {
        Condition::leaf(field, Operator::Gte, value)
    }

    /// Matches documents where the field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Condition {
        Condition::leaf(field, Operator::Lt, value)
    }

    /// Matches documents where the field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Condition {
        Condition::leaf(field, Operator::Lte, value)
    }

    /// Matches documents where the field equals (or, for arrays, contains) any candidate.
    pub fn is_in(field: impl Into<String>, candidates: impl Into<Bson>) -> Condition {
        Condition::leaf(field, Operator::In, candidates)
    }

    /// Matches documents where the field contains the value, or any of the values.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Condition {
        Condition::leaf(field, Operator::Contains, value)
    }

    /// Case-insensitive variant of [`Filter::contains`] for string fields.
    pub fn icontains(field: impl Into<String>, value: impl Into<String>) -> Condition {
        Condition::leaf(field, Operator::IContains, value.into())
    }

    /// Matches documents where any of the values appears in the field.
    pub fn contains_any<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Condition {
        let values = values.into_iter().map(Into::into).collect::<Vec<Bson>>();
        Condition::leaf(field, Operator::ContainsAny, values)
    }

    /// Matches documents where the field is present, even if null.
    pub fn exists(field: impl Into<String>) -> Condition {
        Condition::leaf(field, Operator::Exists, true)
    }

    /// Matches documents where the field is absent.
    pub fn not_exists(field: impl Into<String>) -> Condition {
        Condition::leaf(field, Operator::Exists, false)
    }

    /// Matches documents whose field has the given runtime category.
    pub fn has_type(field: impl Into<String>, type_name: impl Into<String>) -> Condition {
        Condition::leaf(field, Operator::Type, type_name.into())
    }

    /// Matches documents whose field matches a compiled regular expression.
    pub fn regex(field: impl Into<String>, regex: &Regex) -> Condition {
        Condition::leaf(field, Operator::Regex, format!("/{}/", regex.as_str()))
    }

    /// Matches documents whose field matches a `/pattern/flags` string or a bare pattern.
    pub fn pattern(field: impl Into<String>, pattern: impl Into<String>) -> Condition {
        Condition::leaf(field, Operator::Regex, pattern.into())
    }

    /// Matches documents matching all of the conditions.
    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Condition {
        Condition::And(conditions.into_iter().collect())
    }

    /// Matches documents matching any of the conditions.
    pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Condition {
        Condition::Or(conditions.into_iter().collect())
    }

    /// Matches documents not matching the condition.
    pub fn not(condition: Condition) -> Condition {
        condition.not()
    }
}

/// Visitor over condition trees.
///
/// Implementors supply one method per node kind; [`ConditionVisitor::visit_condition`]
/// dispatches on the node.
pub trait ConditionVisitor {
    type Output;
    type Error: Into<QueryError>;

    fn visit_and(&mut self, children: &[Condition]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, children: &[Condition]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, child: &Condition) -> Result<Self::Output, Self::Error>;
    fn visit_leaf(
        &mut self,
        field: &str,
        op: Operator,
        operand: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_condition(&mut self, condition: &Condition) -> Result<Self::Output, Self::Error> {
        match condition {
            Condition::And(children) => self.visit_and(children),
            Condition::Or(children) => self.visit_or(children),
            Condition::Not(child) => self.visit_not(child),
            Condition::Leaf { field, op, operand } => self.visit_leaf(field, *op, operand),
        }
    }
}

impl From<Infallible> for QueryError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Encodes a condition back into its document form.
struct ConditionEncoder;

impl ConditionEncoder {
    fn encode_children(&mut self, key: &str, children: &[Condition]) -> Result<Bson, Infallible> {
        let encoded = children
            .iter()
            .map(|child| self.visit_condition(child))
            .collect::<Result<Vec<_>, _>>()?;

        let mut document = Document::new();
        document.insert(key, encoded);
        Ok(Bson::Document(document))
    }
}

impl ConditionVisitor for ConditionEncoder {
    type Output = Bson;
    type Error = Infallible;

    fn visit_and(&mut self, children: &[Condition]) -> Result<Self::Output, Self::Error> {
        self.encode_children("$and", children)
    }

    fn visit_or(&mut self, children: &[Condition]) -> Result<Self::Output, Self::Error> {
        self.encode_children("$or", children)
    }

    fn visit_not(&mut self, child: &Condition) -> Result<Self::Output, Self::Error> {
        let mut document = Document::new();
        document.insert("$not", self.visit_condition(child)?);
        Ok(Bson::Document(document))
    }

    fn visit_leaf(
        &mut self,
        field: &str,
        op: Operator,
        operand: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let mut test = Document::new();
        test.insert(op.key(), operand.clone());

        let mut document = Document::new();
        document.insert(field, test);
        Ok(Bson::Document(document))
    }
}
