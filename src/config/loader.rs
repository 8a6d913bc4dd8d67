//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use crate::engine::DedupPolicy;
use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.yaml";

/// Config directories for the project and user tiers.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // Project dir: INSPECTION_LINEAGE_PROJECT_DIR or $CWD/inspection-lineage
        let project_dir = std::env::var("INSPECTION_LINEAGE_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("inspection-lineage")));

        // User dir: INSPECTION_LINEAGE_USER_DIR or ~/.inspection-lineage
        let user_dir = std::env::var("INSPECTION_LINEAGE_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".inspection-lineage")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Read one YAML tier. A missing file is simply absent; an unreadable or
/// malformed one is skipped with a warning.
fn read_tier(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read config file, skipping");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid YAML in config file, skipping");
            None
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority config file that contributed, if any.
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;

        if let Ok(explicit) = std::env::var("INSPECTION_LINEAGE_CONFIG_PATH") {
            // An explicit file replaces the project and user tiers.
            let path = PathBuf::from(explicit);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Cannot read config file {}", path.display()))?;
            tiers.push(serde_yaml::from_str(&content)?);
            config_path = Some(path);
        } else {
            for dir in [&paths.project_dir, &paths.user_dir].into_iter().flatten() {
                let file = dir.join(CONFIG_FILE);
                if let Some(value) = read_tier(&file) {
                    debug!(path = %file.display(), "Loaded config tier");
                    tiers.push(value);
                    config_path = Some(file);
                }
            }
        }

        let mut config: Config = serde_json::from_value(deep_merge_all(tiers))?;
        Self::apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) -> Result<()> {
        if let Ok(db_path) = std::env::var("INSPECTION_LINEAGE_DB_PATH") {
            config.store.db_path = PathBuf::from(db_path);
        }

        if let Ok(page_size) = std::env::var("INSPECTION_LINEAGE_PAGE_SIZE") {
            config.engine.page_size = page_size
                .parse()
                .with_context(|| format!("INSPECTION_LINEAGE_PAGE_SIZE is not a number: {}", page_size))?;
        }

        if let Ok(depth) = std::env::var("INSPECTION_LINEAGE_MAX_CHAIN_DEPTH") {
            config.engine.max_chain_depth = depth
                .parse()
                .with_context(|| format!("INSPECTION_LINEAGE_MAX_CHAIN_DEPTH is not a number: {}", depth))?;
        }

        if let Ok(policy) = std::env::var("INSPECTION_LINEAGE_DEDUP_POLICY") {
            config.engine.dedup_policy = DedupPolicy::parse(&policy)
                .ok_or_else(|| anyhow!("Unknown INSPECTION_LINEAGE_DEDUP_POLICY: {}", policy))?;
        }

        Ok(())
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Get the config file path that was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
