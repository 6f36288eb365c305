//! Frozen query parameters.
//!
//! [`QueryParameters`] is the immutable snapshot a [`QueryBuilder`](crate::builder::QueryBuilder)
//! produces and the pipeline executes. It also has a stable document form, used by the
//! [`wire`](crate::wire) codec to ship parameters to a remote fetcher.

use std::collections::BTreeSet;

use bson::{Bson, Document};

use crate::{
    collation::{CaseFirst, Collator, Sensitivity},
    document::as_number,
    error::{QueryError, QueryResult},
    query::Condition,
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    fn to_bson(self) -> Bson {
        match self {
            SortDirection::Asc => Bson::Int32(1),
            SortDirection::Desc => Bson::Int32(-1),
        }
    }

    fn from_bson(value: &Bson) -> QueryResult<Self> {
        match (value.as_str(), as_number(value)) {
            (Some("asc"), _) => Ok(SortDirection::Asc),
            (Some("desc"), _) => Ok(SortDirection::Desc),
            (_, Some(direction)) if direction >= 0.0 => Ok(SortDirection::Asc),
            (_, Some(_)) => Ok(SortDirection::Desc),
            _ => Err(QueryError::InvalidParameters(format!(
                "invalid sort direction {}",
                value
            ))),
        }
    }
}

/// One key of a multi-key sort.
///
/// # Example
///
/// ```ignore
/// use docquery_core::params::SortKey;
/// use docquery_core::collation::Sensitivity;
///
/// let key = SortKey::asc("name").numeric().sensitivity(Sensitivity::Base);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// Dotted path of the sorted field.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
    /// Compare runs of digits by numeric value.
    pub numeric: bool,
    /// Which string differences are significant; `None` means every difference.
    pub sensitivity: Option<Sensitivity>,
    /// Which case variant sorts first; `None` means lower case first.
    pub case_first: Option<CaseFirst>,
}

impl SortKey {
    /// Creates a sort key with the given direction.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
            numeric: false,
            sensitivity: None,
            case_first: None,
        }
    }

    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Enables natural ordering of digit runs.
    pub fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    /// Sets the collation sensitivity.
    pub fn sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }

    /// Sets which case variant sorts first.
    pub fn case_first(mut self, case_first: CaseFirst) -> Self {
        self.case_first = Some(case_first);
        self
    }

    /// The collator string values of this key are compared with.
    pub fn collator(&self) -> Collator {
        Collator::new()
            .numeric(self.numeric)
            .sensitivity(self.sensitivity.unwrap_or_default())
            .case_first(self.case_first.unwrap_or_default())
    }

    fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert("field", self.field.as_str());
        document.insert("direction", self.direction.to_bson());
        if self.numeric {
            document.insert("numeric", true);
        }
        if let Some(sensitivity) = self.sensitivity {
            document.insert("sensitivity", sensitivity.as_str());
        }
        if let Some(case_first) = self.case_first {
            document.insert("caseFirst", case_first.as_str());
        }
        document
    }

    fn from_document(document: &Document) -> QueryResult<Self> {
        let field = document
            .get_str("field")
            .map_err(|_| QueryError::InvalidParameters("sort key without a field".to_string()))?;

        let direction = match document.get("direction") {
            Some(direction) => SortDirection::from_bson(direction)?,
            None => SortDirection::Asc,
        };

        let sensitivity = match document.get("sensitivity").and_then(Bson::as_str) {
            Some(name) => Some(Sensitivity::parse(name).ok_or_else(|| {
                QueryError::InvalidParameters(format!("unknown sensitivity {}", name))
            })?),
            None => None,
        };

        let case_first = match document.get("caseFirst").and_then(Bson::as_str) {
            Some(name) => Some(CaseFirst::parse(name).ok_or_else(|| {
                QueryError::InvalidParameters(format!("unknown case ordering {}", name))
            })?),
            None => None,
        };

        Ok(Self {
            field: field.to_string(),
            direction,
            numeric: document.get_bool("numeric").unwrap_or(false),
            sensitivity,
            case_first,
        })
    }
}

/// Whether a projection keeps or removes its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Keep only the listed fields (and `id`).
    Only,
    /// Remove the listed fields.
    Without,
}

/// Top-level field selection.
///
/// The `_` token stands for every private field.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub mode: ProjectionMode,
    pub fields: BTreeSet<String>,
}

impl Projection {
    /// Token selecting every field whose name starts with `_`.
    pub const PRIVATE_FIELDS: &'static str = "_";

    pub fn only<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            mode: ProjectionMode::Only,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn without<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            mode: ProjectionMode::Without,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    fn key(&self) -> &'static str {
        match self.mode {
            ProjectionMode::Only => "only",
            ProjectionMode::Without => "without",
        }
    }
}

/// The item a surround query is centred on.
#[derive(Debug, Clone, PartialEq)]
pub enum SurroundTarget {
    /// The document whose `path` equals this string.
    Path(String),
    /// The first document matching this condition.
    Condition(Condition),
}

impl From<&str> for SurroundTarget {
    fn from(path: &str) -> Self {
        SurroundTarget::Path(path.to_string())
    }
}

impl From<String> for SurroundTarget {
    fn from(path: String) -> Self {
        SurroundTarget::Path(path)
    }
}

impl From<Condition> for SurroundTarget {
    fn from(condition: Condition) -> Self {
        SurroundTarget::Condition(condition)
    }
}

/// A window of items around a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Surround {
    pub target: SurroundTarget,
    /// Number of items preceding the target.
    pub before: usize,
    /// Number of items following the target.
    pub after: usize,
}

impl Surround {
    /// Items on each side of the target when none are requested explicitly.
    pub const DEFAULT_SPAN: usize = 1;

    pub fn new(target: impl Into<SurroundTarget>) -> Self {
        Self {
            target: target.into(),
            before: Self::DEFAULT_SPAN,
            after: Self::DEFAULT_SPAN,
        }
    }

    /// Total length of the resulting window.
    pub fn window_len(&self) -> usize {
        self.before + self.after
    }
}

/// An immutable snapshot of everything a query asks for.
///
/// # Example
///
/// ```ignore
/// use docquery_core::builder::QueryBuilder;
/// use docquery_core::query::Filter;
///
/// let params = QueryBuilder::new()
///     .filter(Filter::eq("category", "c1"))
///     .limit(10)
///     .params();
/// assert_eq!(params.limit, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryParameters {
    /// Conditions every result must satisfy.
    pub where_clauses: Vec<Condition>,
    /// Sort keys, first key primary.
    pub sort: Vec<SortKey>,
    /// Number of sorted results to skip; applied only when positive.
    pub skip: Option<i64>,
    /// Maximum number of results; applied only when positive.
    pub limit: Option<i64>,
    pub projection: Option<Projection>,
    pub surround: Option<Surround>,
    /// Return the first result only.
    pub first: bool,
    /// Return the number of matching documents.
    pub count: bool,
}

impl QueryParameters {
    /// The effective skip, if any.
    pub fn effective_skip(&self) -> Option<usize> {
        self.skip.filter(|skip| *skip > 0).map(|skip| skip as usize)
    }

    /// The effective limit, if any.
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|limit| *limit > 0).map(|limit| limit as usize)
    }

    /// Returns the document form of these parameters.
    ///
    /// The form is deterministic: equal parameters always produce equal documents.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();

        if !self.where_clauses.is_empty() {
            let clauses = self
                .where_clauses
                .iter()
                .map(|clause| Bson::Document(clause.to_document()))
                .collect::<Vec<_>>();
            document.insert("where", clauses);
        }

        if !self.sort.is_empty() {
            let keys = self
                .sort
                .iter()
                .map(|key| Bson::Document(key.to_document()))
                .collect::<Vec<_>>();
            document.insert("sort", keys);
        }

        if let Some(skip) = self.skip {
            document.insert("skip", skip);
        }
        if let Some(limit) = self.limit {
            document.insert("limit", limit);
        }

        if let Some(projection) = &self.projection {
            let fields = projection.fields.iter().cloned().collect::<Vec<_>>();
            document.insert(projection.key(), fields);
        }

        if let Some(surround) = &self.surround {
            let query = match &surround.target {
                SurroundTarget::Path(path) => Bson::String(path.clone()),
                SurroundTarget::Condition(condition) => Bson::Document(condition.to_document()),
            };

            let mut inner = Document::new();
            inner.insert("query", query);
            inner.insert("before", surround.before as i64);
            inner.insert("after", surround.after as i64);
            document.insert("surround", inner);
        }

        if self.first {
            document.insert("first", true);
        }
        if self.count {
            document.insert("count", true);
        }

        document
    }

    /// Rebuilds parameters from their document form.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidParameters`] for malformed entries and
    /// [`QueryError::InvalidCondition`] for unparseable `where` clauses.
    pub fn from_document(document: &Document) -> QueryResult<Self> {
        let mut params = QueryParameters::default();

        if let Some(clauses) = document.get("where") {
            params.where_clauses = array(clauses, "where")?
                .iter()
                .cloned()
                .map(Condition::from_bson)
                .collect::<QueryResult<_>>()?;
        }

        if let Some(keys) = document.get("sort") {
            params.sort = array(keys, "sort")?
                .iter()
                .map(|key| match key {
                    Bson::Document(key) => SortKey::from_document(key),
                    other => Err(QueryError::InvalidParameters(format!(
                        "invalid sort key {}",
                        other
                    ))),
                })
                .collect::<QueryResult<_>>()?;
        }

        params.skip = document.get("skip").map(|skip| integer(skip, "skip")).transpose()?;
        params.limit = document.get("limit").map(|limit| integer(limit, "limit")).transpose()?;

        match (document.get("only"), document.get("without")) {
            (Some(_), Some(_)) => {
                return Err(QueryError::InvalidParameters(
                    "only and without are mutually exclusive".to_string(),
                ));
            }
            (Some(fields), None) => params.projection = Some(Projection::only(strings(fields, "only")?)),
            (None, Some(fields)) => params.projection = Some(Projection::without(strings(fields, "without")?)),
            (None, None) => {}
        }

        if let Some(surround) = document.get("surround") {
            let Bson::Document(surround) = surround else {
                return Err(QueryError::InvalidParameters("surround must be a document".to_string()));
            };

            let target = match surround.get("query") {
                Some(Bson::String(path)) => SurroundTarget::Path(path.clone()),
                Some(Bson::Document(condition)) => SurroundTarget::Condition(Condition::parse(condition.clone())?),
                _ => {
                    return Err(QueryError::InvalidParameters(
                        "surround query must be a path or a condition".to_string(),
                    ));
                }
            };

            let span = |key: &str| -> QueryResult<usize> {
                match surround.get(key) {
                    Some(value) => Ok(integer(value, key)?.max(0) as usize),
                    None => Ok(Surround::DEFAULT_SPAN),
                }
            };

            params.surround = Some(Surround {
                target,
                before: span("before")?,
                after: span("after")?,
            });
        }

        params.first = document.get_bool("first").unwrap_or(false);
        params.count = document.get_bool("count").unwrap_or(false);

        Ok(params)
    }
}

fn array<'a>(value: &'a Bson, key: &str) -> QueryResult<&'a Vec<Bson>> {
    value
        .as_array()
        .ok_or_else(|| QueryError::InvalidParameters(format!("{} must be an array", key)))
}

fn integer(value: &Bson, key: &str) -> QueryResult<i64> {
    match value {
        Bson::Int32(value) => Ok(*value as i64),
        Bson::Int64(value) => Ok(*value),
        Bson::Double(value) if value.fract() == 0.0 => Ok(*value as i64),
        other => Err(QueryError::InvalidParameters(format!(
            "{} must be an integer, found {}",
            key, other
        ))),
    }
}

fn strings(value: &Bson, key: &str) -> QueryResult<Vec<String>> {
    array(value, key)?
        .iter()
        .map(|field| {
            field.as_str().map(str::to_string).ok_or_else(|| {
                QueryError::InvalidParameters(format!("{} must list field names", key))
            })
        })
        .collect()
}
