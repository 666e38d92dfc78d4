//! Configuration for the signal-graph editor
//!
//! Settings are stored as TOML in the platform configuration directory:
//! - **Linux**: `~/.config/dev.signalgraph.signalgraph-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.signalgraph.signalgraph-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.signalgraph.signalgraph-rs\config.toml`
//!
//! # Example
//!
//! ```toml
//! [history]
//! max_depth = 200
//!
//! [libraries]
//! search_paths = ["/usr/share/signalgraph/lib"]
//! auto_resolve = true
//!
//! [logging]
//! filter = "info,signalgraph_rs=debug"
//! file = "/tmp/signalgraph.log"
//! ```

use crate::error::{EditError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for configuration directories
pub const APP_ID: &str = "dev.signalgraph.signalgraph-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default number of undo steps kept
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,signalgraph_rs=debug";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Top-level editor configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub libraries: LibraryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Undo/redo settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undoable edits kept
    #[serde(default = "default_history_depth")]
    pub max_depth: usize,
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

/// Where referenced libraries are looked up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directories searched in order
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Load referenced libraries automatically when opening a graph
    #[serde(default = "default_true")]
    pub auto_resolve: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            auto_resolve: true,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
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
            filter: DEFAULT_LOG_FILTER.to_string(),
            file: None,
        }
    }
}

impl EditorConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        config_dir().map(|p| p.join(CONFIG_FILE))
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EditError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            EditError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load configuration, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EditError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| EditError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| EditError::Config(format!("Failed to write config: {}", e)))
    }
}
