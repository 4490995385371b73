//! # Decision Trace
//!
//! Advisory record of what the resolver decided at each step. Nothing in
//! the resolver reads it back; it exists so a surprising build order can be
//! explained after the fact.

use log::debug;
use serde::Serialize;
use std::fmt;

use crate::priority::Priority;
use crate::tree::{PackageId, TreePath};

/// One resolver decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A new node is being expanded
    EnteredNode {
        id: PackageId,
        path: TreePath,
        ceiling: Priority,
    },

    /// A second reference to an existing node was dropped
    PrunedDuplicate {
        parent: PackageId,
        dependency: PackageId,
        position: usize,
    },

    /// `node` depends on its own ancestor `dependency`
    DetectedCycle {
        node: PackageId,
        dependency: PackageId,
        priority: Priority,
        weakest: Option<Priority>,
        pruned: bool,
    },

    /// `promoted` replaced `demoted` as a direct dependency of `parent`
    Rewired {
        parent: PackageId,
        promoted: PackageId,
        demoted: PackageId,
        cut_from: PackageId,
    },

    /// A node with nothing to build before it
    Leaf { id: PackageId, path: TreePath },

    /// A stub for a package provided outside the build
    External { id: PackageId, path: TreePath },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::EnteredNode { id, path, ceiling } => {
                write!(f, "enter {} at {} (ceiling {})", id, path, ceiling)
            }
            TraceEvent::PrunedDuplicate {
                parent,
                dependency,
                position,
            } => write!(f, "duplicate {} -> {} (edge {})", parent, dependency, position),
            TraceEvent::DetectedCycle {
                node,
                dependency,
                priority,
                weakest,
                pruned,
            } => {
                let weakest = weakest.map(Priority::as_str).unwrap_or("none");
                let action = if *pruned { "pruned" } else { "backtrack" };
                write!(
                    f,
                    "cycle {} -> {} ({} vs weakest {}): {}",
                    node, dependency, priority, weakest, action
                )
            }
            TraceEvent::Rewired {
                parent,
                promoted,
                demoted,
                cut_from,
            } => write!(
                f,
                "rewire {}: {} replaces {} (cut from {})",
                parent, promoted, demoted, cut_from
            ),
            TraceEvent::Leaf { id, path } => write!(f, "leaf {} at {}", id, path),
            TraceEvent::External { id, path } => write!(f, "external {} at {}", id, path),
        }
    }
}

/// Receiver of resolver decisions
pub trait TraceSink {
    fn record(&mut self, event: TraceEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    fn record(&mut self, _event: TraceEvent) {}
}

/// Renders events through the `log` facade at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&mut self, event: TraceEvent) {
        debug!("{}", event);
    }
}

impl TraceSink for Vec<TraceEvent> {
    fn record(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

impl<T: TraceSink + ?Sized> TraceSink for &mut T {
    fn record(&mut self, event: TraceEvent) {
        (**self).record(event);
    }
}
