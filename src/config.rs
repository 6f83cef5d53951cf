//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/reltree/reltree.toml`
//! 3. Local config: `<dir>/.reltree.toml` (usually the working directory)
//! 4. Environment variables: `RELTREE_*` prefix
//!
//! Command line flags are applied on top by the CLI.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::ChangePolicy;

/// Raw settings for intermediate parsing; `None` means "not specified".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub catalog: Option<PathBuf>,
    pub policy: Option<ChangePolicy>,
}

/// Unified configuration for reltree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Release catalog file (default: `<data dir>/reltree/catalog.toml`)
    pub catalog: PathBuf,
    /// Policy for change-items found only on the start path
    pub policy: ChangePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog: default_catalog_path(),
            policy: ChangePolicy::default(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    ProjectDirs::from("", "", "reltree")
        .map(|dirs| dirs.data_dir().join("catalog.toml"))
        .unwrap_or_else(|| PathBuf::from("~/.reltree/catalog.toml"))
}

/// Get the XDG config directory for reltree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "reltree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("reltree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".reltree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand `~`, `$VAR` and `${VAR}` in the catalog path.
    ///
    /// Unresolvable variables leave the path unchanged.
    fn expand_paths(&mut self) {
        let raw = self.catalog.to_string_lossy().into_owned();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.catalog = PathBuf::from(expanded.as_ref());
        }
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            catalog: overlay
                .catalog
                .clone()
                .unwrap_or_else(|| self.catalog.clone()),
            policy: overlay.policy.unwrap_or(self.policy),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.reltree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("local config: {}", local_path.display());
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply RELTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("RELTREE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("catalog") {
            settings.catalog = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("policy") {
            settings.policy = val.parse().map_err(|message| ApplicationError::Config {
                message: format!("RELTREE_POLICY: {message}"),
            })?;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# reltree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/reltree/reltree.toml
#   Local:  ./.reltree.toml
#   Env:    RELTREE_CATALOG, RELTREE_POLICY
#   Flags:  --catalog, --policy

# Release catalog (TOML file with [[release]] and [[change]] tables); ~ and $VAR are expanded
# catalog = "~/.local/share/reltree/catalog.toml"

# How `diff` treats change-items that exist only on the start release's path:
#   strict   - fail, naming the offending change-item (default)
#   subtract - drop them silently
# policy = "strict"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_settings_then_catalog_is_toml_and_policy_strict() {
        let settings = Settings::default();
        assert!(settings.catalog.to_string_lossy().ends_with("catalog.toml"));
        assert_eq!(settings.policy, ChangePolicy::Strict);
    }

    #[test]
    fn given_tilde_in_catalog_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            catalog: PathBuf::from("~/releases/catalog.toml"),
            policy: ChangePolicy::Strict,
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let catalog = settings.catalog.to_string_lossy();
        assert!(catalog.starts_with(&home), "catalog: {}", catalog);
        assert!(!catalog.contains('~'));
    }

    #[test]
    fn given_overlay_when_merging_then_specified_fields_win() {
        let base = Settings {
            catalog: PathBuf::from("/base/catalog.toml"),
            policy: ChangePolicy::Strict,
        };
        let overlay = RawSettings {
            catalog: None,
            policy: Some(ChangePolicy::Subtract),
        };

        let result = base.merge_with(&overlay);

        assert_eq!(result.catalog, PathBuf::from("/base/catalog.toml"));
        assert_eq!(result.policy, ChangePolicy::Subtract);
    }

    #[test]
    fn given_settings_when_to_toml_then_round_trips() {
        let settings = Settings {
            catalog: PathBuf::from("/tmp/catalog.toml"),
            policy: ChangePolicy::Subtract,
        };

        let text = settings.to_toml().expect("serialize");
        let parsed: Settings = toml::from_str(&text).expect("parse");

        assert_eq!(parsed, settings);
        assert!(text.contains("policy = \"subtract\""));
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert!(raw.catalog.is_none());
        assert!(raw.policy.is_none());
    }
}
