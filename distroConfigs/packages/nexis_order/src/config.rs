//! # Configuration Management
//!
//! Handles parsing and validation of the build-order configuration file.
//! Every field has a default, so an empty file (or no file at the default
//! location) gives a working configuration.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{self, DEFAULT_MAX_REWIRES, DEFAULT_ROOT_ID};
use crate::priority::Priority;
use crate::resolver::ResolveOptions;
use crate::tree::is_valid_id;

/// Main configuration error types
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid TOML syntax: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {msg}")]
    Validation { msg: String },
}

/// Node store backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-memory arena, discarded when the run ends
    #[default]
    Memory,
    /// One record per package under `store_dir`
    Directory,
}

/// Build-order configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfig {
    /// Weakest dependency priority followed for requested packages
    #[serde(default = "default_ceiling")]
    pub ceiling: Priority,

    /// Id of the synthetic root that holds multi-target requests
    #[serde(default = "default_root_id")]
    pub root_id: String,

    /// Abort resolution after this many cycle rewires
    #[serde(default = "default_max_rewires")]
    pub max_rewires: usize,

    #[serde(default)]
    pub store: StoreKind,

    /// Record directory for the `directory` store
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Print every resolver decision
    #[serde(default)]
    pub trace: bool,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            ceiling: default_ceiling(),
            root_id: default_root_id(),
            max_rewires: default_max_rewires(),
            store: StoreKind::default(),
            store_dir: default_store_dir(),
            trace: false,
        }
    }
}

impl OrderConfig {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Err(ConfigError::FileNotFound {
                path: config_path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load config: {:?}", config_path))?;

        debug!("Loaded configuration from {:?}", config_path);
        Ok(config)
    }

    /// Load `explicit` if given, otherwise the default file if it exists,
    /// otherwise the built-in defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = constants::default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    debug!("No config at {:?}, using defaults", default_path);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: OrderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ceiling == Priority::External {
            return Err(ConfigError::Validation {
                msg: "ceiling must be required, recommended or optional".to_string(),
            });
        }

        if !is_valid_id(&self.root_id) {
            return Err(ConfigError::Validation {
                msg: format!("Invalid root_id: '{}'", self.root_id),
            });
        }

        if self.max_rewires == 0 {
            return Err(ConfigError::Validation {
                msg: "max_rewires must be greater than zero".to_string(),
            });
        }

        if self.store == StoreKind::Directory && self.store_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                msg: "store_dir is required for the directory store".to_string(),
            });
        }

        Ok(())
    }

    /// Resolver options described by this configuration
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            ceiling: self.ceiling,
            root_id: self.root_id.clone(),
            max_rewires: self.max_rewires,
        }
    }
}

// Default value functions
fn default_ceiling() -> Priority {
    Priority::Recommended
}

fn default_root_id() -> String {
    DEFAULT_ROOT_ID.to_string()
}

fn default_max_rewires() -> usize {
    DEFAULT_MAX_REWIRES
}

fn default_store_dir() -> PathBuf {
    constants::default_store_dir()
}
