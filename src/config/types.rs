//! Configuration types.

use crate::engine::DedupPolicy;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default rows per task page; matches the usual single-request cap of hosted stores.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Default cap on ancestor chain length.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 32;

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.engine.page_size == 0 {
            bail!("engine.page_size must be at least 1");
        }
        if self.engine.max_chain_depth == 0 {
            bail!("engine.max_chain_depth must be at least 1");
        }
        Ok(())
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".inspection-lineage/inspections.db")
}

/// Lineage resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows requested per task page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Longest ancestor chain resolved before failing.
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,

    /// Which copy of a logical task wins when several chain segments hold one.
    #[serde(default)]
    pub dedup_policy: DedupPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_chain_depth: default_max_chain_depth(),
            dedup_policy: DedupPolicy::default(),
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_chain_depth() -> usize {
    DEFAULT_MAX_CHAIN_DEPTH
}
