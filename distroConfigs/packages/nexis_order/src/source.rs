//! # Dependency Sources
//!
//! The resolver never reads package metadata itself. It asks a
//! [`DependencySource`] for the raw `(priority, dependency)` list of a package
//! and keeps the answer in a [`SourceCache`] for the rest of the run. The
//! cached lists are the only copy the resolver edits: a cycle cut removes an
//! entry, a rewire renames one, and a subtree rebuilt later reads the edited
//! list back so earlier decisions stay in force.

use anyhow::{Context, Result};
use fnv::FnvHashMap;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::priority::Priority;
use crate::tree::{is_valid_id, Edge, PackageId};

/// Dependency source errors
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("Package '{package}' is not known to the dependency source")]
    UnknownPackage { package: PackageId },

    #[error("Invalid dependency record for '{package}': {msg}")]
    InvalidRecord { package: String, msg: String },

    #[error("Invalid TOML in package set: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("I/O error reading package set: {0}")]
    Io(#[from] std::io::Error),
}

/// Provider of raw dependency lists.
///
/// Must answer identically for the same `(id, ceiling)` pair during a run.
pub trait DependencySource {
    /// Dependencies of `id` whose priority is admitted by `ceiling`, in
    /// declaration order
    fn fetch(&self, id: &str, ceiling: Priority) -> Result<Vec<Edge>, SourceError>;
}

impl<D: DependencySource + ?Sized> DependencySource for &D {
    fn fetch(&self, id: &str, ceiling: Priority) -> Result<Vec<Edge>, SourceError> {
        (**self).fetch(id, ceiling)
    }
}

/// One dependency line of a package definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub name: String,

    #[serde(default)]
    pub priority: Priority,
}

/// A package definition as written in a package set file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,

    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageSetFile {
    #[serde(default)]
    packages: Vec<PackageSpec>,
}

/// In-memory package database
///
/// ```toml
/// [[packages]]
/// name = "gcc"
/// dependencies = [
///     { name = "binutils", priority = "required" },
///     { name = "gdb", priority = "optional" },
/// ]
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackageSet {
    packages: FnvHashMap<PackageId, Vec<Edge>>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a package set from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read package set: {:?}", path))?;

        let set = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse package set: {:?}", path))?;

        info!("Loaded {} package definitions from {:?}", set.len(), path);
        Ok(set)
    }

    /// Parse a package set from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, SourceError> {
        let file: PackageSetFile = toml::from_str(content)?;
        let mut set = Self::new();
        for spec in file.packages {
            set.add_spec(spec)?;
        }
        Ok(set)
    }

    /// Add a package from its file form
    pub fn add_spec(&mut self, spec: PackageSpec) -> Result<(), SourceError> {
        let edges = spec
            .dependencies
            .into_iter()
            .map(|dep| Edge::new(dep.priority, dep.name))
            .collect();
        self.add(spec.name, edges)
    }

    /// Add a package with its dependency edges in declaration order
    pub fn add(&mut self, name: impl Into<PackageId>, edges: Vec<Edge>) -> Result<(), SourceError> {
        let name = name.into();
        if !is_valid_id(&name) {
            return Err(SourceError::InvalidRecord {
                package: name,
                msg: "invalid package name".to_string(),
            });
        }

        if let Some(bad) = edges.iter().find(|e| !is_valid_id(&e.target)) {
            return Err(SourceError::InvalidRecord {
                msg: format!("invalid dependency name '{}'", bad.target),
                package: name,
            });
        }

        if self.packages.contains_key(&name) {
            return Err(SourceError::InvalidRecord {
                package: name,
                msg: "package defined twice".to_string(),
            });
        }

        trace!("Registered '{}' with {} dependencies", name, edges.len());
        self.packages.insert(name, edges);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Non-external dependencies that name a package missing from the set,
    /// as `(package, dependency)` pairs sorted by package
    pub fn missing_dependencies(&self) -> Vec<(PackageId, PackageId)> {
        let mut missing = Vec::new();
        for (name, edges) in &self.packages {
            for edge in edges {
                if !edge.is_external() && !self.packages.contains_key(&edge.target) {
                    missing.push((name.clone(), edge.target.clone()));
                }
            }
        }
        missing.sort();
        missing.dedup();
        missing
    }
}

impl DependencySource for PackageSet {
    fn fetch(&self, id: &str, ceiling: Priority) -> Result<Vec<Edge>, SourceError> {
        let edges = self
            .packages
            .get(id)
            .ok_or_else(|| SourceError::UnknownPackage { package: id.to_string() })?;

        Ok(edges
            .iter()
            .filter(|e| e.priority.admitted_by(ceiling))
            .cloned()
            .collect())
    }
}

/// Per-run cache of raw dependency lists.
///
/// Each package is fetched once, at the run's ceiling. Callers that expand
/// deeper in the tree ask for a lower ceiling and get a filtered copy.
#[derive(Debug)]
pub struct SourceCache<D> {
    source: D,
    ceiling: Priority,
    lists: FnvHashMap<PackageId, Vec<Edge>>,
    fetches: usize,
}

impl<D: DependencySource> SourceCache<D> {
    pub fn new(source: D, ceiling: Priority) -> Self {
        Self {
            source,
            ceiling,
            lists: FnvHashMap::default(),
            fetches: 0,
        }
    }

    /// Install a list without consulting the source (used for synthetic
    /// nodes the source does not know)
    pub fn seed(&mut self, id: impl Into<PackageId>, edges: Vec<Edge>) {
        self.lists.insert(id.into(), edges);
    }

    /// Dependencies of `id` admitted by `ceiling`, fetching on first use
    pub fn edges(&mut self, id: &str, ceiling: Priority) -> Result<Vec<Edge>, SourceError> {
        if !self.lists.contains_key(id) {
            let fetched = self.source.fetch(id, self.ceiling)?;
            debug!("Fetched {} dependencies of '{}'", fetched.len(), id);
            self.fetches += 1;
            self.lists.insert(id.to_string(), fetched);
        }

        Ok(self
            .lists
            .get(id)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|e| e.priority.admitted_by(ceiling))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Cached list of `id`, if it was fetched or seeded
    pub fn cached(&self, id: &str) -> Option<&[Edge]> {
        self.lists.get(id).map(Vec::as_slice)
    }

    /// Remove the first cached entry of `owner` equal to `edge`
    pub fn remove_first(&mut self, owner: &str, edge: &Edge) -> bool {
        self.lists
            .get_mut(owner)
            .and_then(|edges| crate::tree::remove_first(edges, |e| e == edge))
            .is_some()
    }

    /// Point the first cached entry of `owner` equal to `edge` at `target`
    pub fn replace_first(&mut self, owner: &str, edge: &Edge, target: &str) -> bool {
        let entry = self
            .lists
            .get_mut(owner)
            .and_then(|edges| edges.iter_mut().find(|e| *e == edge));

        match entry {
            Some(entry) => {
                entry.target = target.to_string();
                true
            }
            None => false,
        }
    }

    /// Number of calls made to the underlying source
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Drop every cached list
    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
