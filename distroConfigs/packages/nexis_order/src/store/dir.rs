use fnv::FnvHashMap;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::{NodeStore, StoreError};
use crate::constants::NODE_RECORD_EXT;
use crate::tree::{is_valid_id, Node, PackageId, TreePath};
use crate::util::{atomic_write, ensure_dir, remove_file_if_exists};

/// Directory-backed node store.
///
/// Every node is a pretty-printed JSON file `<dir>/<id>.tree`. Only the
/// indices are held in memory; record bodies are read back from disk on
/// every `get`, so the directory always reflects the live tree.
#[derive(Debug)]
pub struct DirStore {
    dir: PathBuf,
    by_id: FnvHashMap<PackageId, TreePath>,
    by_path: FnvHashMap<TreePath, PackageId>,
}

impl DirStore {
    /// Open (or create) a store rooted at `dir`, rebuilding the indices from
    /// the records already present
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        ensure_dir(&dir).map_err(backend_error)?;

        let mut store = Self {
            dir,
            by_id: FnvHashMap::default(),
            by_path: FnvHashMap::default(),
        };
        store.rebuild_index()?;

        debug!(
            "Opened directory store at {} with {} nodes",
            store.dir.display(),
            store.by_id.len()
        );
        Ok(store)
    }

    /// Directory the records live in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, NODE_RECORD_EXT))
    }

    fn read_record(&self, path: &Path) -> Result<Node, StoreError> {
        let data = fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| StoreError::Corruption {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })
    }

    fn rebuild_index(&mut self) -> Result<(), StoreError> {
        self.by_id.clear();
        self.by_path.clear();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(NODE_RECORD_EXT) {
                continue;
            }

            let node = self.read_record(&path)?;
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem != node.id {
                return Err(StoreError::Corruption {
                    path,
                    msg: format!("record holds node '{}'", node.id),
                });
            }

            if let Some(existing) = self.by_path.get(&node.path) {
                return Err(StoreError::PathConflict {
                    id: node.id,
                    existing: existing.clone(),
                    path: node.path,
                });
            }

            self.by_path.insert(node.path.clone(), node.id.clone());
            self.by_id.insert(node.id, node.path);
        }

        Ok(())
    }
}

fn backend_error(err: anyhow::Error) -> StoreError {
    StoreError::BackendError {
        msg: format!("{:#}", err),
    }
}

impl NodeStore for DirStore {
    fn exists(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    fn get(&self, id: &str) -> Result<Node, StoreError> {
        if !self.by_id.contains_key(id) {
            return Err(StoreError::NodeNotFound { id: id.to_string() });
        }
        self.read_record(&self.record_path(id))
    }

    fn put(&mut self, node: Node) -> Result<(), StoreError> {
        if !is_valid_id(&node.id) {
            return Err(StoreError::InvalidId { id: node.id });
        }

        if let Some(existing) = self.by_path.get(&node.path) {
            if *existing != node.id {
                return Err(StoreError::PathConflict {
                    id: node.id,
                    existing: existing.clone(),
                    path: node.path,
                });
            }
        }

        let data = serde_json::to_vec_pretty(&node)?;
        atomic_write(self.record_path(&node.id), data).map_err(backend_error)?;

        if let Some(old_path) = self.by_id.insert(node.id.clone(), node.path.clone()) {
            if old_path != node.path {
                self.by_path.remove(&old_path);
            }
        }
        self.by_path.insert(node.path, node.id);
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<Node, StoreError> {
        if !self.by_id.contains_key(id) {
            return Err(StoreError::NodeNotFound { id: id.to_string() });
        }

        let record = self.record_path(id);
        let node = self.read_record(&record)?;
        if !remove_file_if_exists(&record).map_err(backend_error)? {
            warn!("Node record {} vanished before removal", record.display());
        }

        self.by_id.remove(id);
        self.by_path.remove(&node.path);
        Ok(node)
    }

    fn find_by_path(&self, path: &TreePath) -> Option<PackageId> {
        self.by_path.get(path).cloned()
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
        for id in self.ids() {
            remove_file_if_exists(self.record_path(&id)).map_err(backend_error)?;
        }
        self.by_id.clear();
        self.by_path.clear();
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "directory"
    }

    fn is_ancestor_of(&self, id: &str, path: &TreePath) -> Result<bool, StoreError> {
        let own = self
            .by_id
            .get(id)
            .ok_or_else(|| StoreError::NodeNotFound { id: id.to_string() })?;
        Ok(own.is_prefix_of(path))
    }
}
