use log::{debug, trace, warn};

use super::{Backtrack, Outcome, ResolveError, Resolver};
use crate::source::DependencySource;
use crate::store::NodeStore;
use crate::trace::{TraceEvent, TraceSink};
use crate::tree::{Edge, Node, PackageId};

/// What became of one edge of the node being expanded
enum Step {
    /// Edge stays; move on
    Next,
    /// Edge is marked for removal once the node is complete
    Drop,
    /// This node closed a cycle that must be rotated higher up
    Cycle(Backtrack),
    /// A descendant raised a backtrack
    Backtrack(Backtrack),
}

impl<S: NodeStore, D: DependencySource, T: TraceSink> Resolver<S, D, T> {
    /// Expand `node`, whose path and priority path are already set.
    ///
    /// The record is stored with its full edge list before any child is
    /// visited, so that an erase started further down can find every node
    /// placed below it.
    pub(super) fn expand(&mut self, mut node: Node) -> Result<Outcome, ResolveError> {
        let ceiling = self.ceiling_at(node.depth());
        node.edges = self
            .sources
            .edges(&node.id, ceiling)
            .map_err(|source| ResolveError::MalformedSource {
                package: node.id.clone(),
                source,
            })?;

        self.trace.record(TraceEvent::EnteredNode {
            id: node.id.clone(),
            path: node.path.clone(),
            ceiling,
        });
        if node.edges.is_empty() {
            self.trace.record(TraceEvent::Leaf {
                id: node.id.clone(),
                path: node.path.clone(),
            });
        }
        self.store.put(node.clone())?;

        let mut doomed: Vec<(usize, PackageId)> = Vec::new();
        let mut index = 0;

        while index < node.edges.len() {
            let edge = node.edges[index].clone();

            match self.visit(&node, &edge, index)? {
                Step::Next => index += 1,
                Step::Drop => {
                    doomed.push((index, edge.target));
                    index += 1;
                }
                Step::Cycle(bt) => {
                    self.store.put(node)?;
                    return Ok(Outcome::Backtrack(bt));
                }
                Step::Backtrack(bt) if bt.target_parent == node.id => {
                    // Same position again, now holding the promoted package
                    self.rewire(&mut node, index, bt)?;
                }
                Step::Backtrack(mut bt) => {
                    if bt.priority.is_stronger_than(edge.priority) {
                        trace!(
                            "'{}' -> '{}' ({}) is the weakest link so far",
                            node.id,
                            edge.target,
                            edge.priority
                        );
                        bt.promote = edge.target;
                        bt.priority = edge.priority;
                    }
                    self.store.put(node)?;
                    return Ok(Outcome::Backtrack(bt));
                }
            }
        }

        // Descending, so earlier positions stay valid
        for (index, dependency) in doomed.into_iter().rev() {
            match node.edges.get(index) {
                Some(edge) if edge.target == dependency => {
                    node.edges.remove(index);
                }
                _ => {
                    return Err(ResolveError::DuplicateRemovalMismatch {
                        package: node.id,
                        dependency,
                        index,
                    })
                }
            }
        }

        self.store.put(node)?;
        Ok(Outcome::Complete)
    }

    fn visit(&mut self, parent: &Node, edge: &Edge, index: usize) -> Result<Step, ResolveError> {
        let candidate = parent.path.child(index);

        // The synthetic root sits above everything and would swallow a real
        // package of the same name as a cycle
        if self.top_level_depth > 0 && edge.target == self.options.root_id {
            return Err(ResolveError::InvalidRequest {
                msg: format!(
                    "'{}' depends on '{}', which is the synthetic root id; choose another root_id",
                    parent.id, edge.target
                ),
            });
        }

        if self.store.exists(&edge.target) {
            if edge.is_external() || !self.store.is_ancestor_of(&edge.target, &candidate)? {
                self.stats.pruned_duplicates += 1;
                self.trace.record(TraceEvent::PrunedDuplicate {
                    parent: parent.id.clone(),
                    dependency: edge.target.clone(),
                    position: index,
                });
                return Ok(Step::Drop);
            }
            return self.close_cycle(parent, edge);
        }

        let child = Node::child_of(parent, edge, index);

        if edge.is_external() {
            self.stats.externals += 1;
            self.trace.record(TraceEvent::External {
                id: child.id.clone(),
                path: child.path.clone(),
            });
            self.store.put(child)?;
            return Ok(Step::Next);
        }

        match self.expand(child)? {
            Outcome::Complete => Ok(Step::Next),
            Outcome::Backtrack(bt) => Ok(Step::Backtrack(bt)),
        }
    }

    /// `current` depends on `edge.target`, which is one of its ancestors
    fn close_cycle(&mut self, current: &Node, edge: &Edge) -> Result<Step, ResolveError> {
        let existing = self.store.get(&edge.target)?;

        // Tree edges from the re-entered node down to `current`
        let weakest = current
            .priority_path
            .weakest_in(existing.depth()..current.depth());
        let pruned = weakest.map_or(true, |weakest| !edge.priority.is_stronger_than(weakest));

        self.trace.record(TraceEvent::DetectedCycle {
            node: current.id.clone(),
            dependency: existing.id.clone(),
            priority: edge.priority,
            weakest,
            pruned,
        });

        if pruned {
            self.stats.pruned_cycles += 1;
            if !self.sources.remove_first(&current.id, edge) {
                warn!(
                    "Cycle edge '{}' -> '{}' missing from the cached dependency list",
                    current.id, edge.target
                );
            }
            return Ok(Step::Drop);
        }

        let parent_path = existing
            .path
            .parent()
            .ok_or_else(|| ResolveError::UnresolvableCycle {
                package: existing.id.clone(),
                via: current.id.clone(),
                msg: "the cycle closes on the tree root".to_string(),
            })?;

        let target_parent = self.store.find_by_path(&parent_path).ok_or_else(|| {
            ResolveError::OrphanReference {
                package: existing.id.clone(),
                path: parent_path.clone(),
            }
        })?;

        debug!(
            "Cycle through '{}' needs a rotation at '{}'",
            existing.id, target_parent
        );

        Ok(Step::Cycle(Backtrack {
            target_parent,
            promote: current.id.clone(),
            demote: existing.id,
            priority: edge.priority,
        }))
    }
}
