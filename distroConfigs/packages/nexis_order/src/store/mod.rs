//! # Node Store
//!
//! Keyed storage for the canonical [`Node`] of every package currently in the
//! dependency tree. Besides the id lookup, every backend keeps a secondary
//! path index so the resolver can ask "which package sits at this position",
//! which is how it finds the parent of a node that closed a cycle.
//!
//! ## Backends
//! - [`ArenaStore`]: in-memory arena, the default for a single build run
//! - [`DirStore`]: one JSON record per package in a directory, so the tree
//!   of the last run can be inspected after the process exits

use std::path::PathBuf;

use crate::tree::{Node, PackageId, TreePath};

pub use arena::ArenaStore;
pub use dir::DirStore;

pub mod arena;
pub mod dir;

/// Store operation errors
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Node not found: {id}")]
    NodeNotFound { id: PackageId },

    #[error("Path {path} is already occupied by '{existing}', cannot store '{id}'")]
    PathConflict {
        id: PackageId,
        existing: PackageId,
        path: TreePath,
    },

    #[error("Invalid package id '{id}'")]
    InvalidId { id: String },

    #[error("Corrupt node record {path}: {msg}")]
    Corruption { path: PathBuf, msg: String },

    #[error("Backend operation failed: {msg}")]
    BackendError { msg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage backend for tree nodes
pub trait NodeStore {
    /// Check whether a canonical node exists for `id`
    fn exists(&self, id: &str) -> bool;

    /// Read the node for `id`
    fn get(&self, id: &str) -> Result<Node, StoreError>;

    /// Insert or replace the node keyed by `node.id`
    fn put(&mut self, node: Node) -> Result<(), StoreError>;

    /// Delete the node for `id`, returning the removed record
    fn delete(&mut self, id: &str) -> Result<Node, StoreError>;

    /// Id of the node stored at exactly `path`
    fn find_by_path(&self, path: &TreePath) -> Option<PackageId>;

    /// Number of live nodes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all live nodes, sorted
    fn ids(&self) -> Vec<PackageId>;

    /// Remove every node
    fn clear(&mut self) -> Result<(), StoreError>;

    /// Get the backend type name for logging
    fn backend_type(&self) -> &'static str;

    /// Whether the node for `id` sits at or above `path`
    fn is_ancestor_of(&self, id: &str, path: &TreePath) -> Result<bool, StoreError> {
        Ok(self.get(id)?.path.is_prefix_of(path))
    }
}
