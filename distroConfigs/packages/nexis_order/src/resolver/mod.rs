//! # Build Order Resolution
//!
//! Turns a package request into a build order in three phases:
//!
//! 1. **Expansion** builds a tree by following dependency lists depth first.
//!    Every package is placed once. A later reference to a placed package is
//!    either a plain duplicate (dropped) or a cycle back to one of its own
//!    ancestors.
//! 2. **Cycle resolution** weighs the edge that closed the cycle against the
//!    weakest tree edge inside it. A closing edge that is no stronger is
//!    dropped. Otherwise a [`Backtrack`] travels up the call chain to the
//!    parent of the re-entered package, which rotates the cycle so that it
//!    is cut at its weakest edge instead.
//! 3. **Traversal** walks the finished tree and emits every package after
//!    the packages it depends on.
//!
//! Optional dependencies are only followed for packages requested directly;
//! deeper in the tree the ceiling is clamped to `recommended`.

use log::info;
use serde::Serialize;

use crate::constants::{DEFAULT_MAX_REWIRES, DEFAULT_ROOT_ID, TARGETS_TOP_LEVEL_DEPTH};
use crate::priority::Priority;
use crate::source::{DependencySource, SourceCache, SourceError};
use crate::store::{NodeStore, StoreError};
use crate::trace::{LogTrace, TraceSink};
use crate::tree::{is_valid_id, Edge, Node, PackageId, TreePath};

mod expand;
mod rewire;
pub mod traversal;

pub use traversal::build_order;

/// Resolver error types
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("Malformed dependency data for '{package}': {source}")]
    MalformedSource {
        package: PackageId,
        #[source]
        source: SourceError,
    },

    #[error("No node at {path} while resolving '{package}'")]
    OrphanReference { package: PackageId, path: TreePath },

    #[error("Unresolvable cycle through '{package}' closed by '{via}': {msg}")]
    UnresolvableCycle {
        package: PackageId,
        via: PackageId,
        msg: String,
    },

    /// Invariant guard: a marked edge no longer holds the package it was
    /// marked for. Rewires only touch the edge being visited, which is
    /// never behind a mark, so valid input does not reach this.
    #[error("Duplicate removal in '{package}' expected '{dependency}' at edge {index}")]
    DuplicateRemovalMismatch {
        package: PackageId,
        dependency: PackageId,
        index: usize,
    },

    #[error("Invalid request: {msg}")]
    InvalidRequest { msg: String },

    #[error("Node store error: {0}")]
    Store(#[from] StoreError),
}

/// Request to rotate a cycle, carried up the call chain.
///
/// `target_parent` is the parent of the re-entered package `demote`. When
/// the signal reaches it, `promote` takes over `demote`'s edge and the edge
/// that used to lead to `promote` is cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backtrack {
    pub target_parent: PackageId,
    pub promote: PackageId,
    pub demote: PackageId,
    /// Weakest edge priority seen on the way up
    pub priority: Priority,
}

/// Result of expanding one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Backtrack(Backtrack),
}

/// Tunables for a resolution run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Weakest priority followed for directly requested packages
    pub ceiling: Priority,
    /// Id of the synthetic root used by [`Resolver::resolve_targets`]
    pub root_id: PackageId,
    /// Abort after this many rewires
    pub max_rewires: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            ceiling: Priority::Recommended,
            root_id: DEFAULT_ROOT_ID.to_string(),
            max_rewires: DEFAULT_MAX_REWIRES,
        }
    }
}

/// Counters collected during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    pub nodes: usize,
    pub pruned_duplicates: usize,
    pub pruned_cycles: usize,
    pub rewires: usize,
    pub externals: usize,
    pub erased: usize,
}

/// A finished build order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOrder {
    /// Package ids, every one after all of its dependencies
    pub order: Vec<PackageId>,
    pub stats: ResolveStats,
}

/// Dependency tree builder and cycle resolver
pub struct Resolver<S, D, T = LogTrace> {
    store: S,
    sources: SourceCache<D>,
    trace: T,
    options: ResolveOptions,
    stats: ResolveStats,
    /// Deepest level that still expands at the full ceiling
    top_level_depth: usize,
}

impl<S: NodeStore, D: DependencySource> Resolver<S, D, LogTrace> {
    /// Create a resolver that traces through the `log` facade
    pub fn new(store: S, source: D, options: ResolveOptions) -> Self {
        Self::with_trace(store, source, options, LogTrace)
    }
}

impl<S: NodeStore, D: DependencySource, T: TraceSink> Resolver<S, D, T> {
    pub fn with_trace(store: S, source: D, options: ResolveOptions, trace: T) -> Self {
        Self {
            store,
            sources: SourceCache::new(source, options.ceiling),
            trace,
            options,
            stats: ResolveStats::default(),
            top_level_depth: 0,
        }
    }

    /// Resolve the build order of a single package.
    ///
    /// The package itself is the tree root and comes last in the order.
    pub fn resolve(&mut self, root: &str) -> Result<BuildOrder, ResolveError> {
        if !is_valid_id(root) {
            return Err(ResolveError::InvalidRequest {
                msg: format!("invalid package id '{}'", root),
            });
        }

        self.reset(0)?;
        info!(
            "Resolving build order for '{}' (ceiling {}, {} store)",
            root,
            self.options.ceiling,
            self.store.backend_type()
        );

        self.run(Node::root(root))?;
        let order = self.order(root)?;
        Ok(self.finish(order))
    }

    /// Resolve the build order of several packages at once.
    ///
    /// The targets hang off a synthetic root, so each of them is expanded as
    /// a directly requested package. The synthetic root is not part of the
    /// returned order.
    pub fn resolve_targets(&mut self, targets: &[PackageId]) -> Result<BuildOrder, ResolveError> {
        let root_id = self.options.root_id.clone();
        if let Some(bad) = targets.iter().find(|t| !is_valid_id(t) || **t == root_id) {
            return Err(ResolveError::InvalidRequest {
                msg: format!("invalid target '{}'", bad),
            });
        }

        self.reset(TARGETS_TOP_LEVEL_DEPTH)?;
        info!(
            "Resolving build order for {} targets (ceiling {}, {} store)",
            targets.len(),
            self.options.ceiling,
            self.store.backend_type()
        );

        let edges = targets
            .iter()
            .map(|t| Edge::new(Priority::Required, t.as_str()))
            .collect();
        self.sources.seed(root_id.as_str(), edges);

        self.run(Node::root(root_id.as_str()))?;
        let mut order = self.order(&root_id)?;
        order.retain(|id| *id != root_id);
        Ok(self.finish(order))
    }

    /// Current build order of the tree rooted at `root`
    pub fn order(&self, root: &str) -> Result<Vec<PackageId>, ResolveError> {
        Ok(build_order(&self.store, root)?)
    }

    /// Delete `id` and every node placed below it, returning how many
    /// records were removed. Nodes only referenced from inside the subtree
    /// but placed elsewhere survive.
    pub fn erase(&mut self, id: &str) -> Result<usize, ResolveError> {
        rewire::erase(&mut self.store, id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Take the store and the trace sink back
    pub fn into_parts(self) -> (S, T) {
        (self.store, self.trace)
    }

    pub fn trace(&self) -> &T {
        &self.trace
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn stats(&self) -> &ResolveStats {
        &self.stats
    }

    fn reset(&mut self, top_level_depth: usize) -> Result<(), ResolveError> {
        if !self.store.is_empty() {
            info!("Clearing {} nodes left from a previous run", self.store.len());
        }
        self.store.clear()?;
        self.sources.clear();
        self.stats = ResolveStats::default();
        self.top_level_depth = top_level_depth;
        Ok(())
    }

    fn run(&mut self, root: Node) -> Result<(), ResolveError> {
        match self.expand(root)? {
            Outcome::Complete => Ok(()),
            Outcome::Backtrack(bt) => Err(ResolveError::UnresolvableCycle {
                package: bt.demote,
                via: bt.promote,
                msg: "backtrack passed the tree root".to_string(),
            }),
        }
    }

    fn finish(&mut self, order: Vec<PackageId>) -> BuildOrder {
        self.stats.nodes = order.len();
        info!(
            "Build order has {} packages ({} rewires, {} cycles pruned, {} duplicates pruned)",
            self.stats.nodes, self.stats.rewires, self.stats.pruned_cycles, self.stats.pruned_duplicates
        );
        BuildOrder {
            order,
            stats: self.stats.clone(),
        }
    }

    /// Ceiling for expanding a node at `depth`
    fn ceiling_at(&self, depth: usize) -> Priority {
        if depth <= self.top_level_depth {
            self.options.ceiling
        } else {
            self.options.ceiling.min(Priority::Recommended)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PackageSet;
    use crate::store::ArenaStore;
    use crate::trace::TraceEvent;
    use proptest::prelude::*;

    use Priority::{External, Optional, Recommended, Required};

    type TestResolver = Resolver<ArenaStore, PackageSet, Vec<TraceEvent>>;

    fn packages(defs: &[(&str, &[(Priority, &str)])]) -> PackageSet {
        let mut set = PackageSet::new();
        for (name, deps) in defs {
            let edges = deps.iter().map(|(p, d)| Edge::new(*p, *d)).collect();
            set.add(*name, edges).unwrap();
        }
        set
    }

    fn resolver(set: PackageSet, ceiling: Priority) -> TestResolver {
        let options = ResolveOptions {
            ceiling,
            ..ResolveOptions::default()
        };
        Resolver::with_trace(ArenaStore::new(), set, options, Vec::new())
    }

    fn position(order: &[PackageId], id: &str) -> usize {
        order
            .iter()
            .position(|x| x == id)
            .unwrap_or_else(|| panic!("'{}' missing from {:?}", id, order))
    }

    fn direct(resolver: &TestResolver, id: &str) -> Vec<PackageId> {
        resolver
            .store()
            .get(id)
            .unwrap()
            .edges
            .into_iter()
            .map(|e| e.target)
            .collect()
    }

    #[test]
    fn test_linear_chain() {
        let set = packages(&[
            ("a", &[(Required, "b")]),
            ("b", &[(Required, "c")]),
            ("c", &[]),
        ]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(result.order, vec!["c", "b", "a"]);
        assert_eq!(result.stats.nodes, 3);
        assert!(resolver
            .trace()
            .contains(&TraceEvent::Leaf { id: "c".to_string(), path: TreePath::from(vec![0, 0]) }));
    }

    #[test]
    fn test_diamond_places_shared_dependency_once() {
        let set = packages(&[
            ("a", &[(Required, "b"), (Required, "c")]),
            ("b", &[(Required, "d")]),
            ("c", &[(Required, "d")]),
            ("d", &[]),
        ]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(result.order.iter().filter(|id| *id == "d").count(), 1);
        assert!(position(&result.order, "d") < position(&result.order, "b"));
        assert!(position(&result.order, "d") < position(&result.order, "c"));
        assert_eq!(result.stats.pruned_duplicates, 1);
        assert!(direct(&resolver, "c").is_empty());
        assert_eq!(resolver.store().len(), 4);
    }

    #[test]
    fn test_strong_closing_edge_rewires_cycle() {
        // b -> c is the weakest link of the loop b -> c -> b
        let set = packages(&[
            ("a", &[(Required, "b")]),
            ("b", &[(Recommended, "c")]),
            ("c", &[(Required, "b")]),
        ]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(result.order, vec!["b", "c", "a"]);
        assert_eq!(result.stats.rewires, 1);

        // c is now the direct dependency of a, b only hangs below c
        assert_eq!(direct(&resolver, "a"), vec!["c"]);
        assert_eq!(direct(&resolver, "c"), vec!["b"]);
        assert!(direct(&resolver, "b").is_empty());

        let c = resolver.store().get("c").unwrap();
        assert_eq!(c.path, TreePath::from(vec![0]));
        assert_eq!(c.priority_path.as_slice(), &[Required]);

        assert!(resolver.trace().iter().any(|e| matches!(
            e,
            TraceEvent::Rewired { parent, promoted, demoted, cut_from }
                if parent == "a" && promoted == "c" && demoted == "b" && cut_from == "b"
        )));
    }

    #[test]
    fn test_weak_closing_edge_is_pruned() {
        let set = packages(&[
            ("a", &[(Required, "b")]),
            ("b", &[(Required, "c")]),
            ("c", &[(Recommended, "b")]),
        ]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(result.order, vec!["c", "b", "a"]);
        assert_eq!(result.stats.rewires, 0);
        assert_eq!(result.stats.pruned_cycles, 1);
        assert!(direct(&resolver, "c").is_empty());
    }

    #[test]
    fn test_equal_priority_cycle_is_pruned() {
        let set = packages(&[
            ("a", &[(Required, "b")]),
            ("b", &[(Required, "c")]),
            ("c", &[(Required, "b")]),
        ]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(result.order, vec!["c", "b", "a"]);
        assert_eq!(result.stats.pruned_cycles, 1);
    }

    #[test]
    fn test_self_dependency_is_pruned() {
        let set = packages(&[("a", &[(Required, "b")]), ("b", &[(Required, "b")])]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(result.order, vec!["b", "a"]);
        assert_eq!(result.stats.pruned_cycles, 1);
    }

    #[test]
    fn test_external_dependency_is_a_stub_leaf() {
        let set = packages(&[("a", &[(External, "libx"), (Required, "b")]), ("b", &[(External, "libx")])]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(result.order, vec!["libx", "b", "a"]);
        assert_eq!(result.stats.externals, 1);

        let libx = resolver.store().get("libx").unwrap();
        assert!(libx.external);
        assert!(libx.is_leaf());
        assert!(resolver.trace().contains(&TraceEvent::External {
            id: "libx".to_string(),
            path: TreePath::from(vec![0]),
        }));
    }

    #[test]
    fn test_optional_only_followed_at_top_level() {
        let set = packages(&[
            ("a", &[(Optional, "doc"), (Required, "b")]),
            ("b", &[(Optional, "extra"), (Recommended, "c")]),
            ("c", &[]),
            ("doc", &[]),
            ("extra", &[]),
        ]);
        let mut resolver = resolver(set, Optional);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(result.order, vec!["doc", "c", "b", "a"]);
    }

    #[test]
    fn test_targets_expand_at_full_ceiling() {
        let set = packages(&[
            ("a", &[(Optional, "doc")]),
            ("b", &[(Required, "a")]),
            ("doc", &[(Optional, "never")]),
        ]);
        let mut resolver = resolver(set, Optional);

        let targets = vec!["a".to_string(), "b".to_string()];
        let result = resolver.resolve_targets(&targets).unwrap();
        assert_eq!(result.order, vec!["doc", "a", "b"]);
        assert!(!resolver.store().exists("never"));
        assert_eq!(result.stats.pruned_duplicates, 1);
    }

    #[test]
    fn test_rewire_below_synthetic_root() {
        let set = packages(&[
            ("a", &[(Recommended, "b")]),
            ("b", &[(Required, "a")]),
        ]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve_targets(&["a".to_string()]).unwrap();
        assert_eq!(result.order, vec!["a", "b"]);
        assert_eq!(direct(&resolver, "root"), vec!["b"]);
        assert_eq!(direct(&resolver, "b"), vec!["a"]);
    }

    #[test]
    fn test_rewire_on_directory_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = crate::store::DirStore::open(temp_dir.path()).unwrap();
        let set = packages(&[("a", &[(Recommended, "b")]), ("b", &[(Required, "a")])]);
        let mut resolver = Resolver::new(store, set, ResolveOptions::default());

        let result = resolver.resolve_targets(&["a".to_string()]).unwrap();
        assert_eq!(result.order, vec!["a", "b"]);
        assert_eq!(resolver.stats().erased, 2);
        assert!(temp_dir.path().join("b.tree").exists());
        assert!(temp_dir.path().join("root.tree").exists());
    }

    #[test]
    fn test_rewire_cuts_weakest_edge_higher_up() {
        // Loop b -(opt)-> c -(req)-> d -(req)-> b, requested directly so
        // the optional edge is followed
        let set = packages(&[
            ("b", &[(Optional, "c")]),
            ("c", &[(Required, "d")]),
            ("d", &[(Required, "b")]),
        ]);
        let mut resolver = resolver(set, Optional);

        let result = resolver.resolve_targets(&["b".to_string()]).unwrap();
        assert_eq!(result.order, vec!["b", "d", "c"]);
        assert_eq!(direct(&resolver, "root"), vec!["c"]);
        assert_eq!(direct(&resolver, "c"), vec!["d"]);
        assert_eq!(direct(&resolver, "d"), vec!["b"]);
        assert!(direct(&resolver, "b").is_empty());
    }

    #[test]
    fn test_cycle_on_single_root_is_unresolvable() {
        let set = packages(&[("a", &[(Recommended, "b")]), ("b", &[(Required, "a")])]);
        let mut resolver = resolver(set, Recommended);

        let err = resolver.resolve("a").unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvableCycle { .. }));
    }

    #[test]
    fn test_rewire_limit() {
        let set = packages(&[("a", &[(Recommended, "b")]), ("b", &[(Required, "a")])]);
        let options = ResolveOptions {
            max_rewires: 0,
            ..ResolveOptions::default()
        };
        let mut resolver = Resolver::with_trace(ArenaStore::new(), set, options, crate::trace::NoTrace);

        let err = resolver.resolve_targets(&["a".to_string()]).unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvableCycle { .. }));
    }

    #[test]
    fn test_unknown_package_is_malformed_source() {
        let set = packages(&[("a", &[(Required, "ghost")])]);
        let mut resolver = resolver(set, Recommended);

        match resolver.resolve("a") {
            Err(ResolveError::MalformedSource { package, .. }) => assert_eq!(package, "ghost"),
            other => panic!("unexpected result: {:?}", other.map(|r| r.order)),
        }
    }

    #[test]
    fn test_invalid_requests() {
        let mut resolver = resolver(PackageSet::new(), Recommended);
        assert!(matches!(resolver.resolve(""), Err(ResolveError::InvalidRequest { .. })));
        assert!(matches!(
            resolver.resolve_targets(&["root".to_string()]),
            Err(ResolveError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_dependency_named_like_synthetic_root() {
        let set = packages(&[("app", &[(Required, "root")]), ("root", &[])]);
        let mut resolver = resolver(set, Recommended);

        match resolver.resolve_targets(&["app".to_string()]) {
            Err(ResolveError::InvalidRequest { msg }) => {
                assert!(msg.contains("'app'"), "{}", msg);
                assert!(msg.contains("root_id"), "{}", msg);
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.order)),
        }

        // Without a synthetic root the package is an ordinary dependency
        let result = resolver.resolve("app").unwrap();
        assert_eq!(result.order, vec!["root", "app"]);
        assert_eq!(result.stats.pruned_cycles, 0);
    }

    /// Arena whose path index has lost one position
    struct LossyStore {
        inner: ArenaStore,
        lost: TreePath,
    }

    impl NodeStore for LossyStore {
        fn exists(&self, id: &str) -> bool {
            self.inner.exists(id)
        }

        fn get(&self, id: &str) -> Result<Node, StoreError> {
            self.inner.get(id)
        }

        fn put(&mut self, node: Node) -> Result<(), StoreError> {
            self.inner.put(node)
        }

        fn delete(&mut self, id: &str) -> Result<Node, StoreError> {
            self.inner.delete(id)
        }

        fn find_by_path(&self, path: &TreePath) -> Option<PackageId> {
            if *path == self.lost {
                None
            } else {
                self.inner.find_by_path(path)
            }
        }

        fn len(&self) -> usize {
            self.inner.len()
        }

        fn ids(&self) -> Vec<PackageId> {
            self.inner.ids()
        }

        fn clear(&mut self) -> Result<(), StoreError> {
            self.inner.clear()
        }

        fn backend_type(&self) -> &'static str {
            "lossy"
        }
    }

    #[test]
    fn test_rewire_with_lost_parent_is_orphan_reference() {
        // The rotation must cut b -> c, but nothing answers for b's position
        let set = packages(&[
            ("a", &[(Required, "b")]),
            ("b", &[(Recommended, "c")]),
            ("c", &[(Required, "b")]),
        ]);
        let store = LossyStore {
            inner: ArenaStore::new(),
            lost: TreePath::from(vec![0]),
        };
        let mut resolver = Resolver::with_trace(store, set, ResolveOptions::default(), Vec::new());

        match resolver.resolve("a") {
            Err(ResolveError::OrphanReference { package, path }) => {
                assert_eq!(package, "c");
                assert_eq!(path, TreePath::from(vec![0, 0]));
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.order)),
        }
        assert_eq!(resolver.stats().rewires, 0);
    }

    #[test]
    fn test_order_is_idempotent() {
        let set = packages(&[
            ("a", &[(Required, "b"), (Recommended, "c")]),
            ("b", &[(Required, "c"), (External, "libx")]),
            ("c", &[]),
        ]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(resolver.order("a").unwrap(), result.order);
        assert_eq!(resolver.order("a").unwrap(), resolver.order("a").unwrap());
    }

    #[test]
    fn test_repeated_resolution_starts_fresh() {
        let set = packages(&[("a", &[(Required, "b")]), ("b", &[]), ("x", &[])]);
        let mut resolver = resolver(set, Recommended);

        resolver.resolve("a").unwrap();
        let result = resolver.resolve("x").unwrap();
        assert_eq!(result.order, vec!["x"]);
        assert_eq!(resolver.store().len(), 1);
    }

    #[test]
    fn test_erase_keeps_nodes_placed_elsewhere() {
        // d is placed below b; c only references it
        let set = packages(&[
            ("a", &[(Required, "b"), (Required, "c")]),
            ("b", &[(Required, "d")]),
            ("c", &[(Required, "e")]),
            ("d", &[]),
            ("e", &[(Required, "d")]),
        ]);
        let mut resolver = resolver(set, Recommended);
        resolver.resolve("a").unwrap();

        // Re-attach the cross reference so c's subtree points at d again
        let mut e = resolver.store().get("e").unwrap();
        e.edges.push(Edge::new(Required, "d"));
        resolver.store.put(e).unwrap();

        let removed = resolver.erase("c").unwrap();
        assert_eq!(removed, 2);
        assert!(!resolver.store().exists("c"));
        assert!(!resolver.store().exists("e"));
        assert!(resolver.store().exists("d"));
        assert!(resolver.store().exists("b"));
    }

    #[test]
    fn test_repeated_identical_dependency_lines() {
        let set = packages(&[
            ("a", &[(Required, "b"), (Required, "b"), (Required, "c"), (Required, "b")]),
            ("b", &[]),
            ("c", &[]),
        ]);
        let mut resolver = resolver(set, Recommended);

        let result = resolver.resolve("a").unwrap();
        assert_eq!(result.order, vec!["b", "c", "a"]);
        assert_eq!(direct(&resolver, "a"), vec!["b", "c"]);
        assert_eq!(result.stats.pruned_duplicates, 2);
    }

    fn graph_strategy() -> impl Strategy<Value = (Vec<Vec<(u8, usize)>>, Vec<usize>)> {
        (2usize..9).prop_flat_map(|n| {
            let edges = prop::collection::vec(prop::collection::vec((1u8..=4, 0..n), 0..4), n);
            let targets = prop::collection::vec(0..n, 1..4);
            (edges, targets)
        })
    }

    proptest! {
        #[test]
        fn test_resolved_trees_are_sound((graph, targets) in graph_strategy()) {
            let mut set = PackageSet::new();
            for (i, deps) in graph.iter().enumerate() {
                let edges = deps
                    .iter()
                    .map(|(level, to)| {
                        let priority = Priority::from_level(*level).unwrap_or(Required);
                        let name = if priority == External { format!("ext{}", to) } else { format!("p{}", to) };
                        Edge::new(priority, name)
                    })
                    .collect();
                set.add(format!("p{}", i), edges).unwrap();
            }

            let targets: Vec<PackageId> = targets.iter().map(|t| format!("p{}", t)).collect();
            let mut resolver = resolver(set, Optional);
            let result = resolver.resolve_targets(&targets).unwrap();
            let order = &result.order;

            // Every package appears once, and every stored node is ordered
            let mut unique = order.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), order.len());
            prop_assert_eq!(resolver.store().len(), order.len() + 1);

            for target in &targets {
                prop_assert!(order.contains(target));
            }

            for id in resolver.store().ids() {
                let node = resolver.store().get(&id).unwrap();
                prop_assert_eq!(node.path.depth(), node.priority_path.len());
                if id == "root" {
                    continue;
                }
                let at = position(order, &id);
                for edge in &node.edges {
                    let child = resolver.store().get(&edge.target).unwrap();
                    // Dependencies come first and never sit above their dependent
                    prop_assert!(position(order, &edge.target) < at);
                    prop_assert!(!child.path.is_prefix_of(&node.path));
                }
            }
        }
    }
}
