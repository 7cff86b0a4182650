//! Source units found by directory scans.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;

use super::SOURCE_EXT;
use crate::utils::hash::{ContentHash, compute_file_hash};
use crate::utils::path::{collect_files, file_stem_str, list_files};

/// A source file with its derived identifier and modification identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: PathBuf,
    /// `namespace.Name` when the header declares a package, else the bare stem.
    pub identifier: String,
    pub modified: Option<SystemTime>,
    pub hash: ContentHash,
}

/// Just enough of a source document to learn its namespace.
#[derive(Deserialize)]
struct Header {
    package: Option<String>,
}

impl SourceUnit {
    /// Build a source unit from a path on disk.
    pub fn scan(path: &Path) -> Self {
        let stem = file_stem_str(path);
        let package = std::fs::read_to_string(path)
            .ok()
            .and_then(|text| toml::from_str::<Header>(&text).ok())
            .and_then(|header| header.package)
            .filter(|p| !p.is_empty());

        let identifier = match package {
            Some(package) => format!("{package}.{stem}"),
            None => stem.to_string(),
        };

        Self {
            path: path.to_path_buf(),
            identifier,
            modified: path.metadata().and_then(|m| m.modified()).ok(),
            hash: compute_file_hash(path),
        }
    }

    /// Simple name (file stem).
    pub fn name(&self) -> &str {
        file_stem_str(&self.path)
    }
}

/// Scan every source unit below `dir`, recursively.
pub fn scan_tree(dir: &Path) -> Vec<SourceUnit> {
    collect_files(dir, SOURCE_EXT)
        .iter()
        .map(|p| SourceUnit::scan(p))
        .collect()
}

/// Scan source units directly inside `dir`.
pub fn scan_folder(dir: &Path) -> Vec<SourceUnit> {
    list_files(dir, SOURCE_EXT)
        .iter()
        .map(|p| SourceUnit::scan(p))
        .collect()
}
