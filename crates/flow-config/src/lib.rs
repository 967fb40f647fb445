//! Flow Bridge Configuration
//!
//! Provides configuration for the native boundary layer:
//! - Worker pool sizing for execution environments
//! - Log filtering for the tracing subscriber
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config (~/.flow-bridge/config.toml)
//! 3. Project config (./flow-bridge.toml, or an explicit file)
//! 4. Environment variables (FLOW_BRIDGE_*)
//!
//! # Example
//!
//! ```no_run
//! use flow_config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load().unwrap();
//! println!("worker threads: {}", config.max_threads());
//! ```

pub mod bridge;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use bridge::{BridgeConfig, LoggingConfig, RuntimeConfig, MAX_THREADS};
pub use loader::ConfigLoader;
