//! Global constants for nexis-order
//!
//! Defines paths, limits, and defaults used throughout the build-order engine.

use std::path::PathBuf;

// ============================================================================
// Configuration Paths
// ============================================================================

/// Build-order configuration file
pub const NEXIS_ORDER_CONFIG: &str = "/etc/nexis/order.toml";

// ============================================================================
// Store Paths
// ============================================================================

/// Directory holding one node record per package for the directory store
pub const NEXIS_ORDER_STORE: &str = "/nexis-store/.order";

/// File extension of a persisted node record
pub const NODE_RECORD_EXT: &str = "tree";

// ============================================================================
// Resolver Defaults
// ============================================================================

/// Id of the synthetic root that holds multi-target requests
pub const DEFAULT_ROOT_ID: &str = "root";

/// Upper bound on cycle rewires in a single run
pub const DEFAULT_MAX_REWIRES: usize = 10_000;

/// Depth up to which the synthetic root's targets count as root-level
pub const TARGETS_TOP_LEVEL_DEPTH: usize = 1;

/// Helper to get the default config path
pub fn default_config_path() -> PathBuf {
    PathBuf::from(NEXIS_ORDER_CONFIG)
}

/// Helper to get the default store directory
pub fn default_store_dir() -> PathBuf {
    PathBuf::from(NEXIS_ORDER_STORE)
}
