//! Configuration for the pipeflow engine
//!
//! A single TOML file holds the ambient settings around the graph: how the
//! logger is set up, how large the event channel is, and which limits the
//! expression engine runs under. Every field has a default, so an empty or
//! partial file is valid.
//!
//! # Location
//!
//! `$PIPEFLOW_CONFIG` if set, otherwise `config.toml` in the platform config
//! directory:
//! - **Linux**: `~/.config/dev.pipeflow/`
//! - **macOS**: `~/Library/Application Support/dev.pipeflow/`
//! - **Windows**: `%APPDATA%\dev.pipeflow\`
//!
//! # Example
//!
//! ```toml
//! [logging]
//! filter = "info,pipeflow=debug"
//! file = "/tmp/pipeflow.log"
//!
//! [events]
//! capacity = 256
//!
//! [scripting]
//! max_operations = 5000
//! ```

use crate::error::{PipeflowError, Result};
use crate::pipeline::events::DEFAULT_EVENT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.pipeflow";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config location
pub const CONFIG_ENV: &str = "PIPEFLOW_CONFIG";

/// Default tracing filter when neither the config nor `RUST_LOG` sets one
pub const DEFAULT_LOG_FILTER: &str = "info,pipeflow=debug";

/// Path of the config file, honouring `$PIPEFLOW_CONFIG`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub scripting: ScriptingConfig,
}

/// Logging setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

/// Graph event channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Events beyond this many unread are dropped
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

/// Safety limits for the expression engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptingConfig {
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    #[serde(default = "default_max_expr_depth")]
    pub max_expr_depth: usize,

    #[serde(default = "default_max_string_size")]
    pub max_string_size: usize,

    /// Compiled expressions kept per engine
    #[serde(default = "default_max_cached_expressions")]
    pub max_cached_expressions: usize,
}

fn default_max_operations() -> u64 {
    10_000
}

fn default_max_call_levels() -> usize {
    32
}

fn default_max_expr_depth() -> usize {
    64
}

fn default_max_string_size() -> usize {
    10_000
}

fn default_max_cached_expressions() -> usize {
    crate::scripting::DEFAULT_CACHE_CAPACITY
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            max_call_levels: default_max_call_levels(),
            max_expr_depth: default_max_expr_depth(),
            max_string_size: default_max_string_size(),
            max_cached_expressions: default_max_cached_expressions(),
        }
    }
}

impl EngineConfig {
    /// Load from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            PipeflowError::Config("Could not determine config path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipeflowError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            PipeflowError::Config(format!("Failed to parse config {:?}: {}", path, e))
        })
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Write as TOML, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipeflowError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PipeflowError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            PipeflowError::Config(format!("Failed to write config {:?}: {}", path, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.logging.file.is_none());
        assert_eq!(config.events.capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(config.scripting.max_operations, 10_000);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: EngineConfig = toml::from_str("[scripting]\nmax_call_levels = 4\n").unwrap();
        assert_eq!(config.scripting.max_call_levels, 4);
        assert_eq!(config.scripting.max_expr_depth, 64);
        assert_eq!(config.events, EventsConfig::default());
    }

    #[test]
    fn test_empty_file() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = EngineConfig::default();
        config.events.capacity = 16;
        config.logging.file = Some(dir.path().join("pipeflow.log"));
        config.save_to(&path).unwrap();

        assert_eq!(EngineConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[events]\ncapacity = \"many\"\n").unwrap();

        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, PipeflowError::Config(_)));
    }
}
