//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::bridge::{validate_threads, BridgeConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Project-level configuration file name
pub const PROJECT_CONFIG_FILE: &str = "flow-bridge.toml";

/// Explicit configuration file override
pub const ENV_CONFIG_PATH: &str = "FLOW_BRIDGE_CONFIG";
/// Worker pool size override
pub const ENV_MAX_THREADS: &str = "FLOW_BRIDGE_MAX_THREADS";
/// Log filter override
pub const ENV_LOG_FILTER: &str = "FLOW_BRIDGE_LOG";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.flow-bridge/config.toml) - lowest priority
/// 2. Project config (flow-bridge.toml) - overrides global
/// 3. Environment variables (FLOW_BRIDGE_*) - highest priority
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config file instead of the one in the home directory
    pub fn with_global_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration for the current process
    ///
    /// Uses `FLOW_BRIDGE_CONFIG` when set, otherwise searches upward from the
    /// current directory for `flow-bridge.toml`.
    pub fn load(&mut self) -> ConfigResult<BridgeConfig> {
        if let Ok(path) = env::var(ENV_CONFIG_PATH) {
            return self.load_from_file(Path::new(&path));
        }

        let cwd = env::current_dir()?;
        self.load_from_directory(&cwd)
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find flow-bridge.toml, then merges it
    /// over the global config if one exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<BridgeConfig> {
        let project = self.find_project_config(start_dir)?;
        self.assemble(project)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<BridgeConfig> {
        let project = BridgeConfig::load_from_file(config_path)?;
        self.assemble(Some(project))
    }

    fn assemble(&mut self, project: Option<BridgeConfig>) -> ConfigResult<BridgeConfig> {
        let mut config = self.load_global_config().unwrap_or_default();
        if let Some(project) = project {
            config.merge(&project);
        }
        self.apply_env_overrides(config)
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(&self, start_dir: &Path) -> ConfigResult<Option<BridgeConfig>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                return BridgeConfig::load_from_file(&config_path).map(Some);
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok(None),
            }
        }
    }

    /// Load global configuration from ~/.flow-bridge/config.toml
    fn load_global_config(&mut self) -> ConfigResult<BridgeConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = BridgeConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        // Global config is optional - if it doesn't exist, return default
        if !path.exists() {
            return Ok(BridgeConfig::default());
        }

        BridgeConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides
    ///
    /// Example: FLOW_BRIDGE_MAX_THREADS=8, FLOW_BRIDGE_LOG=flow_bridge=debug
    fn apply_env_overrides(&self, mut config: BridgeConfig) -> ConfigResult<BridgeConfig> {
        if let Ok(raw) = env::var(ENV_MAX_THREADS) {
            let threads = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    field: ENV_MAX_THREADS.to_string(),
                    reason: format!("expected a positive integer, got '{}'", raw),
                })?;
            validate_threads(ENV_MAX_THREADS, threads)?;
            config
                .runtime
                .get_or_insert_with(Default::default)
                .max_threads = Some(threads);
        }

        if let Ok(filter) = env::var(ENV_LOG_FILTER) {
            if !filter.trim().is_empty() {
                config.logging.get_or_insert_with(Default::default).filter = Some(filter);
            }
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
