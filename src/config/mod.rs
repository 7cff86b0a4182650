//! Configuration management for `hotrules.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs     # ConfigError
//! ├── section.rs   # [paths] [namespace] [watch] [toolchain] [[entity]]
//! ├── util.rs      # config file discovery, namespace syntax
//! └── mod.rs       # Config (this file)
//! ```
//!
//! # Sections
//!
//! | Section        | Purpose                                           |
//! |----------------|---------------------------------------------------|
//! | `[paths]`      | Working directory and its item/rule/jar folders   |
//! | `[namespace]`  | Base namespaces of rule and item units            |
//! | `[watch]`      | Rule directory watching and debounce window       |
//! | `[toolchain]`  | External compiler command (empty: built-in)       |
//! | `[[entity]]`   | Static entity registry                            |

mod error;
mod section;
mod util;

pub use error::ConfigError;
pub use section::{EntityConfig, NamespaceConfig, PathsConfig, ToolchainConfig, WatchConfig};
pub use util::{is_valid_entity_name, is_valid_namespace};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::archive::{ITEMS_PACK, RUNTIME_PACK};
use crate::cli::Cli;
use crate::log;
use crate::unit::namespace_dir;
use crate::utils::path::resolve_path;
use util::find_config_file;

/// Root configuration structure representing hotrules.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub namespace: NamespaceConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Static entity registry.
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityConfig>,
}

impl Config {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; falls back to defaults
    /// rooted at cwd when none exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                config
            }
            None => {
                log!("config"; "no {} found, using defaults", cli.config.display());
                Self {
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        if let Some(dir) = &cli.working_dir {
            config.paths.working_dir = dir.clone();
        }

        config.validate()?;
        config.finalize();
        Ok(config)
    }

    /// Default configuration rooted at `root`, paths already resolved.
    pub fn for_root(root: &Path) -> Self {
        let mut config = Self {
            root: root.to_path_buf(),
            ..Self::default()
        };
        config.finalize();
        config
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Check raw values before paths are resolved.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        for (key, ns) in [
            ("namespace.rules", &self.namespace.rules),
            ("namespace.items", &self.namespace.items),
        ] {
            if !is_valid_namespace(ns) {
                errors.push(format!("`{key}`: `{ns}` is not a dot-separated namespace"));
            }
        }
        if self.namespace.rules == self.namespace.items {
            errors.push("`namespace.rules` and `namespace.items` must differ".to_string());
        }

        let paths = &self.paths;
        for (key, path) in [
            ("paths.items", &paths.items),
            ("paths.rules", &paths.rules),
            ("paths.rule_classes", &paths.rule_classes),
            ("paths.extlib", &paths.extlib),
            ("paths.jar", &paths.jar),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(format!("`{key}` must not be empty"));
            }
        }
        if paths.rules == paths.rule_classes {
            errors.push("`paths.rules` and `paths.rule_classes` must differ".to_string());
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for entity in &self.entities {
            if !is_valid_entity_name(&entity.name) {
                errors.push(format!("entity `{}`: not a valid item name", entity.name));
            }
            if !seen.insert(entity.name.as_str()) {
                errors.push(format!("entity `{}` declared twice", entity.name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Resolve every configured directory to an absolute path.
    fn finalize(&mut self) {
        let working_dir = resolve_path(&self.paths.working_dir, &self.root);
        let paths = &mut self.paths;
        for dir in [
            &mut paths.items,
            &mut paths.rules,
            &mut paths.rule_classes,
            &mut paths.extlib,
            &mut paths.jar,
        ] {
            *dir = resolve_path(dir, &working_dir);
        }
        paths.working_dir = working_dir;
    }

    // ========================================================================
    // resolved locations
    // ========================================================================

    pub fn working_dir(&self) -> &Path {
        &self.paths.working_dir
    }

    /// Root of generated item stubs and their compiled units.
    pub fn items_dir(&self) -> &Path {
        &self.paths.items
    }

    pub fn rules_dir(&self) -> &Path {
        &self.paths.rules
    }

    pub fn rule_classes_dir(&self) -> &Path {
        &self.paths.rule_classes
    }

    pub fn extlib_dir(&self) -> &Path {
        &self.paths.extlib
    }

    pub fn jar_dir(&self) -> &Path {
        &self.paths.jar
    }

    /// Folder holding item stubs: the items namespace below the items dir.
    pub fn items_namespace_dir(&self) -> PathBuf {
        namespace_dir(&self.paths.items, &self.namespace.items)
    }

    pub fn items_pack(&self) -> PathBuf {
        self.paths.jar.join(ITEMS_PACK)
    }

    pub fn runtime_pack(&self) -> PathBuf {
        self.paths.jar.join(RUNTIME_PACK)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }
}

/// Parse a config snippet for tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    Config::from_str(content).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.namespace.rules, "org.hotrules.rules.user");
        assert_eq!(config.namespace.items, "org.hotrules.items");
        assert_eq!(config.watch.debounce_ms, 300);
        assert!(config.watch.enabled);
        assert!(config.toolchain.command.is_empty());
        assert!(config.entities.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_entities_and_sections() {
        let config = test_parse_config(
            r#"
            [paths]
            working_dir = "/srv/auto"
            rules = "my-rules"

            [toolchain]
            command = ["rulec", "--strict"]

            [[entity]]
            name = "Lamp"
            type = "Switch"

            [[entity]]
            name = "Temperature"
            type = "Number"
            label = "Living room"
            "#,
        );
        assert_eq!(config.paths.rules, PathBuf::from("my-rules"));
        assert_eq!(config.toolchain.command, vec!["rulec", "--strict"]);
        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.entities[1].label.as_deref(), Some("Living room"));
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) =
            Config::parse_with_ignored("[watch]\nenabled = false\nextension = \"java\"\n").unwrap();
        assert_eq!(ignored, vec!["watch.extension".to_string()]);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let config = test_parse_config(
            r#"
            [namespace]
            rules = "org..bad"
            items = "org..bad"

            [[entity]]
            name = "Lamp"
            [[entity]]
            name = "Lamp"
            "#,
        );
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_finalize_resolves_against_working_dir() {
        let temp = TempDir::new().unwrap();
        let config = Config::for_root(temp.path());
        assert_eq!(config.working_dir(), temp.path().join("."));
        assert_eq!(config.rules_dir(), temp.path().join("./rules"));
        assert_eq!(config.items_pack(), temp.path().join("./jar/items.pack"));
        assert!(
            config
                .items_namespace_dir()
                .ends_with("items/org/hotrules/items")
        );
    }
}
