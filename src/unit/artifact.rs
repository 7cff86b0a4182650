//! Compiled unit format (`*.unit`).
//!
//! One JSON document per compiled source unit. The toolchain writes it,
//! the class path reads it back.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::naming::artifact_path_for;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error on artifact `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("malformed artifact `{}`", .0.display())]
    Json(PathBuf, #[source] serde_json::Error),
}

/// What a unit declares: a rule container or a generated entity stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    #[default]
    Rule,
    Item,
}

/// Trigger kind of a rule method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    #[serde(rename = "changed")]
    Changed,
    #[serde(rename = "received update")]
    ReceivedUpdate,
    #[serde(rename = "received command")]
    ReceivedCommand,
}

impl TriggerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Changed => "changed",
            Self::ReceivedUpdate => "received update",
            Self::ReceivedCommand => "received command",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "changed" => Ok(Self::Changed),
            "received update" | "updated" | "update" => Ok(Self::ReceivedUpdate),
            "received command" | "command" => Ok(Self::ReceivedCommand),
            other => Err(format!(
                "unknown trigger `{other}` (expected `changed`, `received update` or `received command`)"
            )),
        }
    }
}

/// Effect template executed when a rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Command { item: String, command: String },
    Update { item: String, update: String },
    Log { log: String },
}

/// Entity declared by a generated stub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One rule method with its trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledRule {
    pub name: String,
    pub item_name: String,
    /// Qualified identifier of the item stub, when known at compile time.
    pub item_class: Option<String>,
    pub trigger: TriggerKind,
    pub from: Option<String>,
    pub to: Option<String>,
    pub update: Option<String>,
    pub lt: Option<f64>,
    pub lte: Option<f64>,
    pub gt: Option<f64>,
    pub gte: Option<f64>,
    pub event_parameter: bool,
    pub actions: Vec<Action>,
}

/// A compiled unit as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledUnit {
    pub identifier: String,
    pub kind: UnitKind,
    #[serde(default)]
    pub is_abstract: bool,
    /// Zero-argument construction is available.
    pub constructible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub rules: Vec<CompiledRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemDecl>,
    /// Hex blake3 of the source text this unit was compiled from.
    #[serde(default)]
    pub source_hash: String,
}

impl CompiledUnit {
    /// Read a unit from an artifact file.
    pub fn read(path: &Path) -> Result<Self, ArtifactError> {
        let text = fs::read_to_string(path).map_err(|e| ArtifactError::Io(path.to_path_buf(), e))?;
        serde_json::from_str(&text).map_err(|e| ArtifactError::Json(path.to_path_buf(), e))
    }

    /// Write this unit below `root`, returning the artifact path.
    pub fn write(&self, root: &Path) -> Result<PathBuf, ArtifactError> {
        let path = artifact_path_for(root, &self.identifier);
        let io_err = |e| ArtifactError::Io(path.clone(), e);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ArtifactError::Json(path.clone(), e))?;
        fs::write(&path, json).map_err(io_err)?;
        Ok(path)
    }
}
