//! Navigation trees built from document paths.
//!
//! [`NavigationBuilder::build`] groups documents by the directory prefixes of their
//! `path` and returns the top-level nodes of the tree rooted at `/`. Callers filter out
//! partial, draft and navigation-disabled documents beforehand; the builder only skips
//! directories whose metadata opts out of navigation.
//!
//! Directories are described by two sources: an index document whose `path` equals the
//! directory path, and an entry in the directory metadata map (see [`directory_meta`]).
//! Fields of the index document win over the metadata. A directory with an index
//! document lists the index page as its first child.
//!
//! # Example
//!
//! ```ignore
//! use std::collections::HashMap;
//! use docquery_core::navigation::{NavigationBuilder, bottom_link};
//!
//! let tree = NavigationBuilder::new().field("icon").build(&documents, &HashMap::new());
//! let first_link = bottom_link(&tree[0]);
//! ```

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use bson::{Bson, Document};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    collation::{Collator, Sensitivity},
    document::{display_string, document_id, document_path, fields, is_truthy},
    params::{SortDirection, SortKey},
};

/// Placeholder title of directory metadata documents, never shown.
const PLACEHOLDER_TITLE: &str = "dir";

/// Suffix of the paths of directory metadata documents.
const DIRECTORY_META_SUFFIX: &str = "/_dir";

const ROOT: &str = "/";

/// A node of the navigation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationNode {
    /// Identifier of the page this node links to; `None` for directory nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub path: String,
    pub title: String,
    /// Navigation fields picked from the document and its `navigation` overrides.
    #[serde(default, skip_serializing_if = "Document::is_empty")]
    pub meta: Document,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavigationNode>,
}

impl NavigationNode {
    /// Whether this node stands for a directory rather than a page.
    pub fn is_directory(&self) -> bool {
        self.id.is_none()
    }
}

/// Options controlling how nodes are built.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigationOptions {
    /// Document fields copied into each node's `meta`.
    pub fields: Vec<String>,
    /// Keep siblings in input order instead of ordering them by `file`.
    pub preserve_input_order: bool,
}

/// Builds navigation trees.
#[derive(Debug, Clone, Default)]
pub struct NavigationBuilder {
    options: NavigationOptions,
}

impl NavigationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: NavigationOptions) -> Self {
        Self { options }
    }

    /// Copies `field` from documents into node metadata.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.options.fields.push(field.into());
        self
    }

    /// Keeps siblings in input order.
    pub fn preserve_input_order(mut self, preserve: bool) -> Self {
        self.options.preserve_input_order = preserve;
        self
    }

    /// Keeps input order when the documents were sorted by something other than
    /// the default ascending `file` order.
    pub fn ordered_by(self, sort: &[SortKey]) -> Self {
        let default_order = sort.is_empty()
            || sort
                .iter()
                .all(|key| key.field == fields::FILE && key.direction == SortDirection::Asc);
        self.preserve_input_order(!default_order)
    }

    pub fn options(&self) -> &NavigationOptions {
        &self.options
    }

    /// Builds the tree and returns its top-level nodes.
    pub fn build(
        &self,
        documents: &[Document],
        directory_meta: &HashMap<String, Document>,
    ) -> Vec<NavigationNode> {
        let directories = documents
            .iter()
            .filter_map(document_path)
            .flat_map(ancestors)
            .collect::<HashSet<_>>();

        let mut arena = Arena {
            options: &self.options,
            directory_meta,
            directories,
            slots: Vec::with_capacity(documents.len()),
            by_path: HashMap::new(),
            roots: Vec::new(),
        };

        for document in documents {
            arena.insert(document);
        }

        arena.emit_all()
    }
}

/// Builds a navigation tree with default options.
pub fn build(
    documents: &[Document],
    directory_meta: &HashMap<String, Document>,
) -> Vec<NavigationNode> {
    NavigationBuilder::new().build(documents, directory_meta)
}

#[derive(Debug)]
struct Slot {
    node: NavigationNode,
    file: Option<String>,
    children: Vec<usize>,
    index_page: Option<usize>,
    has_page: bool,
}

struct Arena<'a> {
    options: &'a NavigationOptions,
    directory_meta: &'a HashMap<String, Document>,
    directories: HashSet<String>,
    slots: Vec<Slot>,
    by_path: HashMap<String, usize>,
    roots: Vec<usize>,
}

impl Arena<'_> {
    fn insert(&mut self, document: &Document) {
        let Some(path) = document_path(document) else {
            debug!("skipping navigation document without a path: {:?}", document_id(document));
            return;
        };

        let parents = ancestors(path);
        let is_directory = self.directories.contains(path);

        // A root `_dir` covers every document.
        let disabled = std::iter::once(ROOT)
            .chain(parents.iter().map(String::as_str))
            .chain(is_directory.then_some(path))
            .find(|dir| self.is_disabled(dir));
        if let Some(dir) = disabled {
            debug!("skipping {} below navigation-disabled directory {}", path, dir);
            return;
        }

        if let Some(&existing) = self.by_path.get(path) {
            if self.slots[existing].has_page {
                warn!("duplicate navigation path {}, keeping the first document", path);
                return;
            }
        }

        let file = document.get(fields::FILE).map(display_string);

        let mut parent = None;
        for dir in &parents {
            parent = Some(self.directory(dir, parent, file.as_deref()));
        }

        let page = self.push(self.page_node(path, document), file.clone());

        if is_directory {
            let dir = self.directory(path, parent, file.as_deref());
            let title = explicit_title(document);
            let meta = self.slots[page].node.meta.clone();

            let slot = &mut self.slots[dir];
            if let Some(title) = title {
                slot.node.title = title;
            }
            merge(&mut slot.node.meta, meta);
            slot.file = file;
            slot.has_page = true;
            slot.index_page = Some(page);
        } else {
            self.slots[page].has_page = true;
            self.by_path.insert(path.to_string(), page);
            self.attach(parent, page);
        }
    }

    fn is_disabled(&self, dir: &str) -> bool {
        self.directory_meta
            .get(dir)
            .and_then(|meta| meta.get(fields::NAVIGATION_ENABLED))
            .is_some_and(|enabled| matches!(enabled, Bson::Boolean(false)))
    }

    fn directory(&mut self, path: &str, parent: Option<usize>, file: Option<&str>) -> usize {
        if let Some(&index) = self.by_path.get(path) {
            return index;
        }

        let (title, meta) = match self.directory_meta.get(path) {
            Some(config) => (
                explicit_title(config).filter(|title| !title.eq_ignore_ascii_case(PLACEHOLDER_TITLE)),
                self.pick(config),
            ),
            None => (None, Document::new()),
        };

        let node = NavigationNode {
            id: None,
            path: path.to_string(),
            title: title.unwrap_or_else(|| generate_title(last_segment(path))),
            meta,
            children: Vec::new(),
        };

        let index = self.push(node, file.map(str::to_string));
        self.by_path.insert(path.to_string(), index);
        self.attach(parent, index);
        index
    }

    fn page_node(&self, path: &str, document: &Document) -> NavigationNode {
        NavigationNode {
            id: document_id(document),
            path: path.to_string(),
            title: explicit_title(document).unwrap_or_else(|| generate_title(last_segment(path))),
            meta: self.pick(document),
            children: Vec::new(),
        }
    }

    fn pick(&self, document: &Document) -> Document {
        let mut meta = Document::new();

        for field in &self.options.fields {
            if let Some(value) = document.get(field) {
                meta.insert(field.as_str(), value.clone());
            }
        }
        if let Ok(overrides) = document.get_document(fields::NAVIGATION) {
            merge(&mut meta, overrides.clone());
        }

        meta.remove(fields::TITLE);
        meta
    }

    fn push(&mut self, node: NavigationNode, file: Option<String>) -> usize {
        self.slots.push(Slot {
            node,
            file,
            children: Vec::new(),
            index_page: None,
            has_page: false,
        });
        self.slots.len() - 1
    }

    fn attach(&mut self, parent: Option<usize>, child: usize) {
        match parent {
            Some(parent) => self.slots[parent].children.push(child),
            None => self.roots.push(child),
        }
    }

    fn ordered(&self, indices: &[usize]) -> Vec<usize> {
        let mut indices = indices.to_vec();
        if !self.options.preserve_input_order {
            let collator = Collator::new().numeric(true).sensitivity(Sensitivity::Base);
            indices.sort_by(|a, b| {
                compare_files(&collator, self.slots[*a].file.as_deref(), self.slots[*b].file.as_deref())
            });
        }
        indices
    }

    fn emit(&self, index: usize) -> NavigationNode {
        let slot = &self.slots[index];
        let mut node = slot.node.clone();

        node.children = slot
            .index_page
            .into_iter()
            .chain(self.ordered(&slot.children))
            .map(|child| self.emit(child))
            .collect();

        node
    }

    fn emit_all(&self) -> Vec<NavigationNode> {
        self.ordered(&self.roots)
            .into_iter()
            .map(|root| self.emit(root))
            .collect()
    }
}

fn merge(target: &mut Document, source: Document) {
    for (key, value) in source {
        target.insert(key, value);
    }
}

fn compare_files(collator: &Collator, left: Option<&str>, right: Option<&str>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => collator.compare(left, right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Title set by the document itself, through its `navigation` overrides or `title`.
fn explicit_title(document: &Document) -> Option<String> {
    document
        .get_document(fields::NAVIGATION)
        .ok()
        .and_then(|navigation| navigation.get_str(fields::TITLE).ok())
        .or_else(|| document.get_str(fields::TITLE).ok())
        .filter(|title| !title.is_empty())
        .map(str::to_string)
}

/// Proper ancestor directories of a path, outermost first; `/` is never included.
fn ancestors(path: &str) -> Vec<String> {
    let segments = path.trim_start_matches('/').split('/').collect::<Vec<_>>();

    (1..segments.len())
        .map(|depth| format!("/{}", segments[..depth].join("/")))
        .collect()
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Generates a display title from a path segment: `getting-started` becomes `Getting Started`.
pub fn generate_title(segment: &str) -> String {
    segment
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collects directory metadata from `…/_dir` documents.
///
/// Each entry is keyed by the directory containing the `_dir` document (`/` at the top)
/// and holds the document with its `body` sub-document merged in.
pub fn directory_meta(documents: &[Document]) -> HashMap<String, Document> {
    let mut configs = HashMap::new();

    for document in documents {
        let Some(path) = document_path(document) else {
            continue;
        };
        let Some(split) = path.len().checked_sub(DIRECTORY_META_SUFFIX.len()) else {
            continue;
        };
        let is_meta = path
            .get(split..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(DIRECTORY_META_SUFFIX));
        if !is_meta {
            continue;
        }

        let parent = &path[..split];
        let key = if parent.is_empty() { ROOT } else { parent };

        let mut meta = document.clone();
        if let Ok(body) = document.get_document(fields::BODY) {
            merge(&mut meta, body.clone());
        }

        configs.insert(key.to_string(), meta);
    }

    configs
}

/// Returns the path of the first page reachable from `node`.
pub fn bottom_link(node: &NavigationNode) -> Option<&str> {
    if node.children.is_empty() {
        return Some(node.path.as_str());
    }

    node.children.iter().find_map(bottom_link)
}

/// Returns the children of the directory node at `path`.
pub fn dir_from_path<'a>(path: &str, tree: &'a [NavigationNode]) -> Option<&'a [NavigationNode]> {
    tree.iter().find_map(|node| {
        if node.path == path && node.is_directory() {
            Some(node.children.as_slice())
        } else {
            dir_from_path(path, &node.children)
        }
    })
}

/// Returns the first node at `path`, directory or page.
pub fn page_from_path<'a>(path: &str, tree: &'a [NavigationNode]) -> Option<&'a NavigationNode> {
    tree.iter().find_map(|node| {
        if node.path == path {
            Some(node)
        } else {
            page_from_path(path, &node.children)
        }
    })
}

/// Returns the innermost value of `key` along the branch leading to `path`.
///
/// `title` reads the node title; every other key reads node metadata. The root page
/// only contributes when `path` is `/` itself.
pub fn key_from_path(path: &str, key: &str, tree: &[NavigationNode]) -> Option<Bson> {
    fn visit(path: &str, key: &str, tree: &[NavigationNode], value: &mut Option<Bson>) {
        for node in tree {
            if path != ROOT && node.path == ROOT {
                continue;
            }

            if path.starts_with(node.path.as_str()) {
                let found = if key == fields::TITLE {
                    Some(Bson::String(node.title.clone())).filter(is_truthy)
                } else {
                    node.meta.get(key).filter(|value| is_truthy(value)).cloned()
                };
                if found.is_some() {
                    *value = found;
                }
            }

            if node.path == path {
                return;
            }

            visit(path, key, &node.children, value);
        }
    }

    let mut value = None;
    visit(path, key, tree, &mut value);
    value
}
