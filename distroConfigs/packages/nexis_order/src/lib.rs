//! NexisOS Build Order Resolver
//!
//! Computes the order in which source packages must be built. Dependency
//! lists are expanded into a tree, circular requirements are detected and
//! cut at their weakest edge, and the finished tree is walked so that every
//! package follows the packages it needs.

#![warn(clippy::all)]

// Core modules
pub mod priority;
pub mod resolver;
pub mod source;
pub mod tree;

// Storage
pub mod store;

// Configuration and observability
pub mod config;
pub mod constants;
pub mod trace;
pub mod util;

// Re-exports for convenience
pub use config::{OrderConfig, StoreKind};
pub use priority::Priority;
pub use resolver::{BuildOrder, ResolveError, ResolveOptions, Resolver};
pub use source::{DependencySource, PackageSet};
pub use store::{ArenaStore, DirStore, NodeStore};
pub use trace::{LogTrace, NoTrace, TraceEvent, TraceSink};
pub use tree::{Edge, Node, PackageId, PriorityPath, TreePath};

/// Resolver version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
