//! Bridge Configuration (flow-bridge.toml)
//!
//! Settings consumed by the native boundary layer at process initialization.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Log filter used when nothing else is configured
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Largest worker count an environment may be created with
pub const MAX_THREADS: usize = 256;

/// Worker count used when the platform cannot report its parallelism
const FALLBACK_THREADS: usize = 4;

/// Top-level bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Execution environment settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeConfig>,

    /// Logging settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Execution environment settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Worker threads for environments created without an explicit size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<usize>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `"flow_bridge=debug"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Emit ANSI colors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansi: Option<bool>,
}

impl BridgeConfig {
    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration text; `origin` is only used in error messages
    pub fn parse(content: &str, origin: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: origin.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(threads) = self.runtime.as_ref().and_then(|r| r.max_threads) {
            validate_threads("runtime.max_threads", threads)?;
        }

        if let Some(filter) = self.logging.as_ref().and_then(|l| l.filter.as_deref()) {
            if filter.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "logging.filter".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the global config file path (~/.flow-bridge/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".flow-bridge").join("config.toml"))
    }

    /// Merge another config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &BridgeConfig) {
        if let Some(runtime) = &other.runtime {
            let target = self.runtime.get_or_insert_with(Default::default);
            if runtime.max_threads.is_some() {
                target.max_threads = runtime.max_threads;
            }
        }
        if let Some(logging) = &other.logging {
            let target = self.logging.get_or_insert_with(Default::default);
            if logging.filter.is_some() {
                target.filter = logging.filter.clone();
            }
            if logging.ansi.is_some() {
                target.ansi = logging.ansi;
            }
        }
    }

    /// Effective worker count (configured > available parallelism > fallback)
    pub fn max_threads(&self) -> usize {
        self.runtime
            .as_ref()
            .and_then(|r| r.max_threads)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get().min(MAX_THREADS))
                    .unwrap_or(FALLBACK_THREADS)
            })
    }

    /// Effective log filter directive
    pub fn log_filter(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.filter.as_deref())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Whether log output uses ANSI colors (off by default; hosts usually capture stderr)
    pub fn log_ansi(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.ansi).unwrap_or(false)
    }
}

pub(crate) fn validate_threads(field: &str, threads: usize) -> ConfigResult<()> {
    if threads == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if threads > MAX_THREADS {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be at most {}", MAX_THREADS),
        });
    }
    Ok(())
}
