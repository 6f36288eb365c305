//! Query execution over an in-memory snapshot.
//!
//! [`execute`] runs the fixed stage order
//! filter → (count) → sort → skip → limit → project → (surround | first | list)
//! over the documents returned by a fetcher. Every stage is synchronous.

use std::cmp::Ordering;

use bson::{Bson, Document};
use log::debug;

use docquery_core::{
    collation::Collator,
    document::{as_number, display_string, document_path, fields, is_nullish, is_private, resolve},
    error::QueryResult,
    params::{Projection, ProjectionMode, QueryParameters, SortDirection, SortKey, Surround, SurroundTarget},
};

use crate::evaluator::{DocumentEvaluator, RegexCache, filter_documents_with};

/// The result of executing a query, shaped by its flags.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// The filtered, sorted, paginated and projected documents.
    Documents(Vec<Document>),
    /// The first document, if any.
    Document(Option<Document>),
    /// The window around a surround target, padded with `None`.
    Surround(Vec<Option<Document>>),
    /// The number of documents matching the clauses.
    Count(usize),
}

impl QueryOutput {
    /// Flattens any output into a list of documents.
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            QueryOutput::Documents(documents) => documents,
            QueryOutput::Document(document) => document.into_iter().collect(),
            QueryOutput::Surround(window) => window.into_iter().flatten().collect(),
            QueryOutput::Count(_) => Vec::new(),
        }
    }
}

/// Executes `params` against `documents`.
///
/// # Errors
///
/// Returns [`QueryError::InvalidRegex`](docquery_core::error::QueryError::InvalidRegex)
/// when a pattern in the clauses or the surround target does not compile.
pub fn execute(documents: Vec<Document>, params: &QueryParameters) -> QueryResult<QueryOutput> {
    let fetched = documents.len();
    let mut regexes = RegexCache::new();

    let mut documents = filter_documents_with(documents, &params.where_clauses, &mut regexes)?;
    debug!("filtered {} of {} documents", documents.len(), fetched);

    if params.count {
        return Ok(QueryOutput::Count(documents.len()));
    }

    sort_documents(&mut documents, &params.sort);

    if let Some(skip) = params.effective_skip() {
        documents = documents.into_iter().skip(skip).collect();
    }
    if let Some(limit) = params.effective_limit() {
        documents.truncate(limit);
    }
    debug!("{} documents after sort and pagination", documents.len());

    if let Some(surround) = &params.surround {
        let window = surround_window(documents, surround, &mut regexes)?;
        let window = window
            .into_iter()
            .map(|document| document.map(|document| maybe_project(document, params.projection.as_ref())))
            .collect();
        return Ok(QueryOutput::Surround(window));
    }

    let documents = documents
        .into_iter()
        .map(|document| maybe_project(document, params.projection.as_ref()));

    if params.first {
        let mut documents = documents;
        return Ok(QueryOutput::Document(documents.next()));
    }

    Ok(QueryOutput::Documents(documents.collect()))
}

/// Sorts documents in place by `keys`, first key primary.
///
/// The sort is stable. Null and absent values sort last in either direction.
pub fn sort_documents(documents: &mut [Document], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }

    let collators = keys.iter().map(SortKey::collator).collect::<Vec<_>>();

    documents.sort_by(|left, right| {
        keys.iter()
            .zip(&collators)
            .map(|(key, collator)| {
                compare_values(
                    resolve(left, &key.field),
                    resolve(right, &key.field),
                    key.direction,
                    collator,
                )
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn compare_values(
    left: Option<&Bson>,
    right: Option<&Bson>,
    direction: SortDirection,
    collator: &Collator,
) -> Ordering {
    match (left, right) {
        (left, right) if is_nullish(left) && is_nullish(right) => Ordering::Equal,
        (left, _) if is_nullish(left) => Ordering::Greater,
        (_, right) if is_nullish(right) => Ordering::Less,
        (Some(left), Some(right)) => {
            let ordering = compare_present(left, right, collator);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
        _ => Ordering::Equal,
    }
}

fn compare_present(left: &Bson, right: &Bson, collator: &Collator) -> Ordering {
    match (left, right) {
        (Bson::DateTime(left), Bson::DateTime(right)) => left.cmp(right),
        (Bson::Boolean(left), Bson::Boolean(right)) => left.cmp(right),
        _ => match (as_number(left), as_number(right)) {
            (Some(left), Some(right)) => left.total_cmp(&right),
            _ => kind_rank(left)
                .cmp(&kind_rank(right))
                .then_with(|| collator.compare(&display_string(left), &display_string(right))),
        },
    }
}

/// Orders values of different kinds: numbers, then dates, then booleans, then the rest.
fn kind_rank(value: &Bson) -> u8 {
    match value {
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => 0,
        Bson::DateTime(_) => 1,
        Bson::Boolean(_) => 2,
        _ => 3,
    }
}

fn maybe_project(document: Document, projection: Option<&Projection>) -> Document {
    match projection {
        Some(projection) => project(document, projection),
        None => document,
    }
}

/// Applies a top-level projection to a document.
///
/// `Only` always keeps `id`. The `_` token selects every private field.
pub fn project(document: Document, projection: &Projection) -> Document {
    let private = projection.fields.contains(Projection::PRIVATE_FIELDS);
    let listed = |field: &str| projection.fields.contains(field) || (private && is_private(field));

    document
        .into_iter()
        .filter(|(field, _)| match projection.mode {
            ProjectionMode::Only => field == fields::ID || listed(field),
            ProjectionMode::Without => !listed(field),
        })
        .collect()
}

/// Returns the `before` documents preceding and `after` documents following the
/// surround target, padded with `None` where the window leaves the list.
///
/// An unmatched target yields a window of `None`s.
pub fn surround_window(
    documents: Vec<Document>,
    surround: &Surround,
    regexes: &mut RegexCache,
) -> QueryResult<Vec<Option<Document>>> {
    let mut target = None;
    for (index, document) in documents.iter().enumerate() {
        let found = match &surround.target {
            SurroundTarget::Path(path) => document_path(document) == Some(path.as_str()),
            SurroundTarget::Condition(condition) => {
                DocumentEvaluator::new(document, regexes).evaluate(condition)?
            }
        };
        if found {
            target = Some(index);
            break;
        }
    }

    let Some(target) = target else {
        debug!("surround target not found among {} documents", documents.len());
        return Ok(vec![None; surround.window_len()]);
    };

    let mut slots = documents.into_iter().map(Some).collect::<Vec<_>>();
    let mut take = |index: Option<usize>| index.and_then(|index| slots.get_mut(index).and_then(Option::take));

    let before = (1..=surround.before)
        .rev()
        .map(|distance| take(target.checked_sub(distance)))
        .collect::<Vec<_>>();
    let after = (1..=surround.after)
        .map(|distance| take(Some(target + distance)))
        .collect::<Vec<_>>();

    Ok(before.into_iter().chain(after).collect())
}
