//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! TranslateHub has two configuration scopes:
//! - **Global**: User-level settings (auto-save, output format)
//! - **Project**: Settings stored next to the translation tree
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$TRANSLATEHUB_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/translatehub/config.toml`
//! 3. `~/.translatehub/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use translatehub::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/locales"))).unwrap();
//! println!("Schema dir: {}", config.schema_dir_name());
//! println!("Auto-save every {:?}", config.auto_save_interval());
//! ```

pub mod schema;

pub use schema::{AutoSaveConfig, GlobalConfig, ProjectConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::paths::PROJECT_CONFIG_FILE;

/// Default schema directory name.
pub const DEFAULT_SCHEMA_DIR: &str = "_schema";

/// Default auto-save interval, in seconds.
pub const DEFAULT_AUTO_SAVE_SECS: u64 = 30;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence rules: project settings override global
/// settings, which override built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if a project root was given)
    pub project: Option<ProjectConfig>,
    global_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_root` is provided, also loads `<root>/.translatehub.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or
    /// fail validation. Missing config files are not an error.
    pub fn load(project_root: Option<&Path>) -> Result<Config, ConfigError> {
        let (global, global_path) = Self::load_global()?;

        let (project, project_path) = match project_root {
            Some(root) => {
                let path = root.join(PROJECT_CONFIG_FILE);
                if path.exists() {
                    (Some(Self::read_toml::<ProjectConfig>(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(p) = &project {
            p.validate()?;
        }

        Ok(Config {
            global,
            project,
            global_path,
            project_path,
        })
    }

    /// Build a config from explicit values, bypassing the filesystem.
    pub fn from_parts(global: GlobalConfig, project: Option<ProjectConfig>) -> Self {
        Self {
            global,
            project,
            global_path: None,
            project_path: None,
        }
    }

    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        // 1. $TRANSLATEHUB_CONFIG
        if let Ok(path) = std::env::var("TRANSLATEHUB_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 2. $XDG_CONFIG_HOME/translatehub/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("translatehub/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. ~/.translatehub/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".translatehub/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write project config atomically to `<root>/.translatehub.toml`.
    pub fn write_project(root: &Path, config: &ProjectConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = root.join(PROJECT_CONFIG_FILE);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ConfigError::WriteError { path, source }
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err(path))?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        // Write to temp file in same directory (for atomic rename)
        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(write_err(&temp_path))?;
        file.write_all(contents.as_bytes())
            .map_err(write_err(&temp_path))?;
        file.sync_all().map_err(write_err(&temp_path))?;

        fs::rename(&temp_path, path).map_err(write_err(path))?;
        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Name of the schema directory.
    ///
    /// Defaults to `_schema`.
    pub fn schema_dir_name(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.schema_dir.as_deref())
            .unwrap_or(DEFAULT_SCHEMA_DIR)
    }

    /// Whether documents are written without indentation.
    ///
    /// Project setting wins over global; defaults to `false`.
    pub fn compress_json(&self) -> bool {
        self.project
            .as_ref()
            .and_then(|p| p.compress_json)
            .or(self.global.compress_json)
            .unwrap_or(false)
    }

    /// Whether reconcile removes keys absent from the schema.
    ///
    /// Defaults to `true`.
    pub fn prune_orphans(&self) -> bool {
        self.project
            .as_ref()
            .and_then(|p| p.prune_orphans)
            .unwrap_or(true)
    }

    /// Whether staged edits are flushed periodically.
    ///
    /// Defaults to `true`.
    pub fn auto_save_enabled(&self) -> bool {
        self.global
            .auto_save
            .as_ref()
            .and_then(|a| a.enabled)
            .unwrap_or(true)
    }

    /// Interval between auto-save flushes.
    ///
    /// Defaults to 30 seconds.
    pub fn auto_save_interval(&self) -> Duration {
        let secs = self
            .global
            .auto_save
            .as_ref()
            .and_then(|a| a.interval_secs)
            .unwrap_or(DEFAULT_AUTO_SAVE_SECS);
        Duration::from_secs(secs)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}
