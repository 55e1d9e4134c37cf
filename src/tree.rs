//! Lazily expanded lookup tree over a merged YAML value.
//!
//! A dotted path such as `a.b.c` is resolved longest key first: at each level
//! the whole remaining path is tried as a single key, then shorter prefixes
//! ending at a separator. A key may therefore legitimately contain the
//! separator (`"a.b"`), and `a.b.c` can resolve as `a` → `b` → `c`, as
//! `"a.b"` → `c`, or as `a` → `"b.c"`. Key comparison ignores case.

use crate::value::{NodeKind, key_label};
use serde_yaml::Value;
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// Separator between path segments.
pub const DEFAULT_SEPARATOR: char = '.';

/// Reserved path that addresses the whole tree.
pub const ROOT: &str = "";

/// Path conventions for a [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    /// Character separating path segments.
    pub separator: char,
    /// Path that short-circuits to the root node.
    pub root_key: String,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            root_key: ROOT.to_string(),
        }
    }
}

/// A labeled value with children computed on first access.
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    key: String,
    value: Value,
    children: OnceLock<Vec<Arc<Node>>>,
}

impl Node {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            kind: NodeKind::of(&value),
            key: key.into(),
            value,
            children: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The label this node is matched by: its mapping key or array index.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// This node's children.
    ///
    /// Computed once from this node's own value and cached; every call
    /// returns a fresh list, so changing it leaves the cache alone.
    pub fn children(&self) -> Vec<Arc<Node>> {
        self.expanded().to_vec()
    }

    /// Find the first longest match for `dotted_path` below this node.
    pub fn find(&self, dotted_path: &str, separator: char) -> Option<Arc<Node>> {
        let segments = Segments::split(dotted_path, separator);
        self.find_from(&segments, 0)
    }

    fn expanded(&self) -> &[Arc<Node>] {
        self.children.get_or_init(|| self.expand())
    }

    fn expand(&self) -> Vec<Arc<Node>> {
        match &self.value {
            Value::Mapping(map) => map
                .iter()
                .map(|(k, v)| Arc::new(Node::new(key_label(k), v.clone())))
                .collect(),
            Value::Sequence(seq) => seq
                .iter()
                .enumerate()
                .map(|(i, v)| Arc::new(Node::new(i.to_string(), v.clone())))
                .collect(),
            Value::Null
            | Value::Bool(_)
            | Value::Number(_)
            | Value::String(_)
            | Value::Tagged(_) => Vec::new(),
        }
    }

    /// Resolve the segments from `start` onward against this node's children.
    fn find_from(&self, segments: &Segments<'_>, start: usize) -> Option<Arc<Node>> {
        let last = segments.len();
        for end in (start + 1..=last).rev() {
            let candidate = segments.span(start, end);
            // A separator at offset 0 leaves nothing shorter to try.
            if candidate.is_empty() {
                break;
            }

            for child in self.expanded() {
                if !eq_fold(&child.key, candidate) {
                    continue;
                }
                if end == last {
                    return Some(Arc::clone(child));
                }
                if let Some(found) = child.find_from(segments, end) {
                    return Some(found);
                }
            }
        }

        None
    }
}

/// The root of a lookup tree plus its path conventions.
#[derive(Debug)]
pub struct Tree {
    root: Arc<Node>,
    options: TreeOptions,
}

impl Tree {
    pub fn new(value: Value, options: TreeOptions) -> Self {
        let root = Arc::new(Node::new(options.root_key.clone(), value));
        Self { root, options }
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    /// Separator and root key this tree resolves paths with.
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Resolve a dotted path. The root key returns the root node itself.
    pub fn find(&self, dotted_path: &str) -> Option<Arc<Node>> {
        if dotted_path == self.options.root_key {
            return Some(Arc::clone(&self.root));
        }

        let found = self.root.find(dotted_path, self.options.separator);
        trace!(path = %dotted_path, found = found.is_some(), "Resolved config path");
        found
    }
}

/// Byte ranges of the segments of a path, computed once per lookup.
struct Segments<'p> {
    text: &'p str,
    /// `(start, end)` of each segment, separators excluded.
    bounds: Vec<(usize, usize)>,
}

impl<'p> Segments<'p> {
    fn split(text: &'p str, separator: char) -> Self {
        let mut bounds = Vec::new();
        let mut start = 0;
        for (at, sep) in text.match_indices(separator) {
            bounds.push((start, at));
            start = at + sep.len();
        }
        bounds.push((start, text.len()));
        Self { text, bounds }
    }

    fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Text covering segments `first..end`, inner separators included.
    fn span(&self, first: usize, end: usize) -> &'p str {
        &self.text[self.bounds[first].0..self.bounds[end - 1].1]
    }
}

/// Case-insensitive comparison by Unicode lower-case mapping.
///
/// Both sides are lower-cased char by char with `char::to_lowercase`, which
/// may expand one char to several (`İ` becomes `i` plus a combining dot).
/// This is full lower-case mapping, not simple case folding.
fn eq_fold(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
