use log::{debug, warn};

use super::{Backtrack, ResolveError, Resolver};
use crate::source::DependencySource;
use crate::store::NodeStore;
use crate::trace::{TraceEvent, TraceSink};
use crate::tree::{Edge, Node};

impl<S: NodeStore, D: DependencySource, T: TraceSink> Resolver<S, D, T> {
    /// Rotate a cycle at `node`, the parent of `bt.demote`.
    ///
    /// The cached edge leading into `bt.promote` is cut, the subtree under
    /// `bt.demote` is erased and edge `index` of `node` is pointed at
    /// `bt.promote`. The caller then expands that edge again.
    pub(super) fn rewire(&mut self, node: &mut Node, index: usize, bt: Backtrack) -> Result<(), ResolveError> {
        if self.stats.rewires >= self.options.max_rewires {
            return Err(ResolveError::UnresolvableCycle {
                package: bt.demote,
                via: bt.promote,
                msg: format!("gave up after {} rewires", self.stats.rewires),
            });
        }

        let old = node
            .edges
            .get(index)
            .filter(|edge| edge.target == bt.demote)
            .cloned()
            .ok_or_else(|| ResolveError::OrphanReference {
                package: bt.demote.clone(),
                path: node.path.child(index),
            })?;

        let promoted = self.store.get(&bt.promote)?;
        let orphan = || ResolveError::OrphanReference {
            package: promoted.id.clone(),
            path: promoted.path.clone(),
        };

        let cut_path = promoted.path.parent().ok_or_else(orphan)?;
        let cut_from = self.store.find_by_path(&cut_path).ok_or_else(orphan)?;
        let cut_priority = promoted.priority_path.last().ok_or_else(orphan)?;

        // Never regenerate the edge that closed the loop on this side
        let cut = Edge::new(cut_priority, bt.promote.as_str());
        if !self.sources.remove_first(&cut_from, &cut) {
            return Err(orphan());
        }

        self.stats.erased += erase(&mut self.store, &bt.demote)?;

        node.edges[index].target = bt.promote.clone();
        if !self.sources.replace_first(&node.id, &old, &bt.promote) {
            warn!(
                "Edge '{}' -> '{}' missing from the cached dependency list",
                node.id, old.target
            );
        }
        self.store.put(node.clone())?;
        self.stats.rewires += 1;

        debug!(
            "Rewired '{}': '{}' replaces '{}', cut '{}' -> '{}'",
            node.id, bt.promote, bt.demote, cut_from, bt.promote
        );
        self.trace.record(TraceEvent::Rewired {
            parent: node.id.clone(),
            promoted: bt.promote,
            demoted: bt.demote,
            cut_from,
        });
        Ok(())
    }
}

/// Delete `id` and the nodes placed below it, returning the count removed.
///
/// A child is only followed if its stored path lies under `id`'s path; a
/// child placed elsewhere in the tree is merely referenced from here.
pub(super) fn erase<S: NodeStore + ?Sized>(store: &mut S, id: &str) -> Result<usize, ResolveError> {
    let node = store.get(id)?;
    let mut removed = 0;

    for edge in &node.edges {
        if !store.exists(&edge.target) {
            continue;
        }
        let child = store.get(&edge.target)?;
        if node.path.is_strict_ancestor_of(&child.path) {
            removed += erase(store, &child.id)?;
        }
    }

    store.delete(id)?;
    Ok(removed + 1)
}
