//! Configuration sections of `hotrules.toml`.
//!
//! ```toml
//! [paths]
//! working_dir = "/etc/hotrules"   # everything below is relative to this
//! items = "items"                 # generated entity stubs
//! rules = "rules"                 # user rule sources (watched)
//! rule_classes = "rule-classes"   # compiled rule units
//! extlib = "ext-lib"              # extra *.pack archives for the rules class path
//! jar = "jar"                     # runtime.pack and items.pack
//!
//! [namespace]
//! rules = "org.hotrules.rules.user"
//! items = "org.hotrules.items"
//!
//! [watch]
//! enabled = true
//! debounce_ms = 300
//!
//! [toolchain]
//! command = []                    # empty: built-in compiler
//!
//! [[entity]]
//! name = "HallwayMotion"
//! type = "Switch"
//! label = "Hallway motion"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub working_dir: PathBuf,
    pub items: PathBuf,
    pub rules: PathBuf,
    pub rule_classes: PathBuf,
    pub extlib: PathBuf,
    pub jar: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            items: PathBuf::from("items"),
            rules: PathBuf::from("rules"),
            rule_classes: PathBuf::from("rule-classes"),
            extlib: PathBuf::from("ext-lib"),
            jar: PathBuf::from("jar"),
        }
    }
}

/// `[namespace]` section: base namespaces of rule and item units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    pub rules: String,
    pub items: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            rules: "org.hotrules.rules.user".to_string(),
            items: "org.hotrules.items".to_string(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Watch the rules directory and reload on change.
    pub enabled: bool,
    /// Quiet period before a burst of changes triggers one reload.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 300,
        }
    }
}

/// `[toolchain]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// External compiler command, e.g. `["rulec", "--strict"]`.
    pub command: Vec<String>,
}

/// One `[[entity]]` of the static registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    #[serde(rename = "type", default = "default_entity_type")]
    pub item_type: String,
    #[serde(default)]
    pub label: Option<String>,
}

fn default_entity_type() -> String {
    "String".to_string()
}
