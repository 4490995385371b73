use fnv::FnvHashMap;
use log::trace;

use super::{NodeStore, StoreError};
use crate::tree::{is_valid_id, Node, PackageId, TreePath};

/// In-memory node store.
///
/// Nodes live in a slot arena so that the erase-and-rebuild churn of a rewire
/// reuses slots instead of growing the allocation. Two indices map ids and
/// paths onto slots.
#[derive(Debug, Default)]
pub struct ArenaStore {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    by_id: FnvHashMap<PackageId, usize>,
    by_path: FnvHashMap<TreePath, usize>,
}

impl ArenaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a node without cloning it
    pub fn node(&self, id: &str) -> Option<&Node> {
        let slot = *self.by_id.get(id)?;
        self.slots[slot].as_ref()
    }

    /// Iterate over all live nodes in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    fn allocate(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }
}

impl NodeStore for ArenaStore {
    fn exists(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    fn get(&self, id: &str) -> Result<Node, StoreError> {
        self.node(id)
            .cloned()
            .ok_or_else(|| StoreError::NodeNotFound { id: id.to_string() })
    }

    fn put(&mut self, node: Node) -> Result<(), StoreError> {
        if !is_valid_id(&node.id) {
            return Err(StoreError::InvalidId { id: node.id });
        }

        if let Some(&occupant) = self.by_path.get(&node.path) {
            if let Some(existing) = &self.slots[occupant] {
                if existing.id != node.id {
                    return Err(StoreError::PathConflict {
                        id: node.id,
                        existing: existing.id.clone(),
                        path: node.path,
                    });
                }
            }
        }

        match self.by_id.get(&node.id).copied() {
            Some(slot) => {
                if let Some(old) = &self.slots[slot] {
                    if old.path != node.path {
                        self.by_path.remove(&old.path);
                    }
                }
                self.by_path.insert(node.path.clone(), slot);
                self.slots[slot] = Some(node);
            }
            None => {
                trace!("Allocating node '{}' at {}", node.id, node.path);
                let id = node.id.clone();
                let path = node.path.clone();
                let slot = self.allocate(node);
                self.by_id.insert(id, slot);
                self.by_path.insert(path, slot);
            }
        }

        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<Node, StoreError> {
        let slot = self
            .by_id
            .remove(id)
            .ok_or_else(|| StoreError::NodeNotFound { id: id.to_string() })?;

        let node = self.slots[slot]
            .take()
            .ok_or_else(|| StoreError::BackendError {
                msg: format!("slot {} for '{}' is already vacant", slot, id),
            })?;

        self.by_path.remove(&node.path);
        self.free.push(slot);
        Ok(node)
    }

    fn find_by_path(&self, path: &TreePath) -> Option<PackageId> {
        let slot = *self.by_path.get(path)?;
        self.slots[slot].as_ref().map(|node| node.id.clone())
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }

    fn ids(&self) -> Vec<PackageId> {
        let mut ids: Vec<PackageId> = self.by_id.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.slots.clear();
        self.free.clear();
        self.by_id.clear();
        self.by_path.clear();
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
