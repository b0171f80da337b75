//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$TRANSLATEHUB_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/translatehub/config.toml`
//! 3. `~/.translatehub/config.toml`
//!
//! # Project Config
//!
//! Located at `<root>/.translatehub.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g., the schema directory
//! must be a usable directory name).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::LanguageId;

/// Smallest accepted auto-save interval, in seconds.
pub const MIN_AUTO_SAVE_SECS: u64 = 5;

/// Largest accepted auto-save interval, in seconds.
pub const MAX_AUTO_SAVE_SECS: u64 = 600;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// compress_json = false
///
/// [auto_save]
/// enabled = true
/// interval_secs = 30
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Write documents without indentation
    pub compress_json: Option<bool>,

    /// Auto-save of staged value edits
    pub auto_save: Option<AutoSaveConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(auto_save) = &self.auto_save {
            auto_save.validate()?;
        }
        Ok(())
    }
}

/// Project configuration.
///
/// # Example
///
/// ```toml
/// schema_dir = "_schema"
/// prune_orphans = true
/// compress_json = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Name of the schema directory (default: "_schema")
    pub schema_dir: Option<String>,

    /// Remove keys absent from the schema on reconcile
    pub prune_orphans: Option<bool>,

    /// Overrides the global compress setting
    pub compress_json: Option<bool>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The schema directory sits next to language directories, so it
        // must obey the same naming rules.
        if let Some(dir) = &self.schema_dir {
            LanguageId::new(dir.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid schema directory name: {}", e))
            })?;
        }
        Ok(())
    }
}

/// Auto-save settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AutoSaveConfig {
    /// Whether staged edits are flushed periodically
    pub enabled: Option<bool>,

    /// Seconds between flushes
    pub interval_secs: Option<u64>,
}

impl AutoSaveConfig {
    /// Validate the auto-save settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secs) = self.interval_secs {
            if !(MIN_AUTO_SAVE_SECS..=MAX_AUTO_SAVE_SECS).contains(&secs) {
                return Err(ConfigError::InvalidValue(format!(
                    "auto-save interval {} out of range ({}..={} seconds)",
                    secs, MIN_AUTO_SAVE_SECS, MAX_AUTO_SAVE_SECS
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = GlobalConfig::default();
            assert!(config.compress_json.is_none());
            assert!(config.auto_save.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn interval_in_range() {
            let config = GlobalConfig {
                auto_save: Some(AutoSaveConfig {
                    enabled: Some(true),
                    interval_secs: Some(30),
                }),
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }

        #[test]
        fn interval_out_of_range() {
            for secs in [0, 4, 601] {
                let config = GlobalConfig {
                    auto_save: Some(AutoSaveConfig {
                        enabled: None,
                        interval_secs: Some(secs),
                    }),
                    ..Default::default()
                };
                assert!(config.validate().is_err(), "{secs} should be rejected");
            }
        }

        #[test]
        fn roundtrip() {
            let config = GlobalConfig {
                compress_json: Some(true),
                auto_save: Some(AutoSaveConfig {
                    enabled: Some(false),
                    interval_secs: Some(120),
                }),
            };

            let toml = toml::to_string_pretty(&config).unwrap();
            let parsed: GlobalConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config, parsed);
        }
    }

    mod project_config {
        use super::*;

        #[test]
        fn valid_schema_dir() {
            let config = ProjectConfig {
                schema_dir: Some("_keys".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }

        #[test]
        fn invalid_schema_dir() {
            for dir in ["", "a/b", ".hidden"] {
                let config = ProjectConfig {
                    schema_dir: Some(dir.to_string()),
                    ..Default::default()
                };
                assert!(config.validate().is_err(), "{dir:?} should be rejected");
            }
        }

        #[test]
        fn reject_unknown_fields() {
            let toml = r#"
                schema_dir = "_schema"
                unknown_field = true
            "#;

            let result: Result<ProjectConfig, _> = toml::from_str(toml);
            assert!(result.is_err());
        }
    }
}
