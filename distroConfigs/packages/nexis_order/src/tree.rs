//! # Dependency Tree Records
//!
//! A package occupies exactly one position in the tree. That position is its
//! [`TreePath`]: the sibling ordinal of every ancestor from the root down.
//! The parallel [`PriorityPath`] remembers how strongly each of those edges
//! was requested, which is what the cycle resolver weighs when it has to
//! decide where a loop gets cut.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::priority::Priority;

/// Package identifier, unique within one build run
pub type PackageId = String;

/// Whether `id` can name a package: non-empty, no whitespace or path
/// separators, and not a hidden file name
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\' || c == '\0')
}

/// Position of a node in the tree, one sibling ordinal per level
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    /// Path of the tree root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Depth of the node (the root has depth 0)
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the `position`-th child of this node
    pub fn child(&self, position: usize) -> Self {
        let mut elems = self.0.clone();
        elems.push(position);
        Self(elems)
    }

    /// Path of the parent, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        self.0.split_last().map(|(_, rest)| Self(rest.to_vec()))
    }

    /// True if `self` equals `other` or is one of its ancestors
    pub fn is_prefix_of(&self, other: &TreePath) -> bool {
        other.0.starts_with(&self.0)
    }

    /// True if `other` lies strictly below `self`
    pub fn is_strict_ancestor_of(&self, other: &TreePath) -> bool {
        self.depth() < other.depth() && self.is_prefix_of(other)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for TreePath {
    fn from(elems: Vec<usize>) -> Self {
        Self(elems)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for elem in &self.0 {
            write!(f, "/{}", elem)?;
        }
        Ok(())
    }
}

/// Priorities of the edges along a [`TreePath`].
///
/// Entry `i` is the priority of the edge entering the node at depth `i + 1`,
/// so both paths of a node always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityPath(Vec<Priority>);

impl PriorityPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Priority path of a child reached through an edge of `priority`
    pub fn child(&self, priority: Priority) -> Self {
        let mut elems = self.0.clone();
        elems.push(priority);
        Self(elems)
    }

    /// Weakest priority over `range`, `None` when the range is empty
    pub fn weakest_in(&self, range: Range<usize>) -> Option<Priority> {
        let end = range.end.min(self.0.len());
        let start = range.start.min(end);
        self.0[start..end].iter().copied().max()
    }

    /// Priority of the edge entering the node itself
    pub fn last(&self) -> Option<Priority> {
        self.0.last().copied()
    }

    pub fn as_slice(&self) -> &[Priority] {
        &self.0
    }
}

impl From<Vec<Priority>> for PriorityPath {
    fn from(elems: Vec<Priority>) -> Self {
        Self(elems)
    }
}

/// A declared dependency: `(priority, target)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub priority: Priority,
    pub target: PackageId,
}

impl Edge {
    pub fn new(priority: Priority, target: impl Into<PackageId>) -> Self {
        Self {
            priority,
            target: target.into(),
        }
    }

    pub fn is_external(&self) -> bool {
        self.priority == Priority::External
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.priority.level(), self.target)
    }
}

/// Canonical record of a package in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: PackageId,
    pub path: TreePath,
    pub priority_path: PriorityPath,

    /// Live dependency edges in declaration order; duplicates allowed
    #[serde(default)]
    pub edges: Vec<Edge>,

    /// Stub for an external package, never expanded
    #[serde(default)]
    pub external: bool,
}

impl Node {
    /// Create the root record of a tree
    pub fn root(id: impl Into<PackageId>) -> Self {
        Self {
            id: id.into(),
            path: TreePath::root(),
            priority_path: PriorityPath::root(),
            edges: Vec::new(),
            external: false,
        }
    }

    /// Create the record for a child reached from `parent` through `edge`
    /// at sibling `position`
    pub fn child_of(parent: &Node, edge: &Edge, position: usize) -> Self {
        Self {
            id: edge.target.clone(),
            path: parent.path.child(position),
            priority_path: parent.priority_path.child(edge.priority),
            edges: Vec::new(),
            external: edge.is_external(),
        }
    }

    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    /// True if the node has no live edges left to build before it
    pub fn is_leaf(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Remove the first entry matching `pred`, returning it
pub(crate) fn remove_first<F>(edges: &mut Vec<Edge>, pred: F) -> Option<Edge>
where
    F: Fn(&Edge) -> bool,
{
    let index = edges.iter().position(pred)?;
    Some(edges.remove(index))
}
