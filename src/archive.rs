//! Unit archives (`*.pack`).
//!
//! An archive is one JSON index of compiled units keyed by identifier,
//! stamped with a blake3 digest of its contents. Archives sit on the class
//! path next to plain artifact directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::unit::artifact::ArtifactError;
use crate::unit::{ARTIFACT_EXT, CompiledUnit, UnitKind};
use crate::utils::path::collect_files;

/// Identifier of the built-in base unit every rule may extend.
pub const RUNTIME_BASE: &str = "org.hotrules.runtime.Rule";
/// File name of the runtime library archive in the jar directory.
pub const RUNTIME_PACK: &str = "runtime.pack";
/// File name of the aggregate items archive in the jar directory.
pub const ITEMS_PACK: &str = "items.pack";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error on archive `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("malformed archive `{}`", .0.display())]
    Json(PathBuf, #[source] serde_json::Error),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// In-memory view of an archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitPack {
    pub digest: String,
    pub units: BTreeMap<String, CompiledUnit>,
}

impl UnitPack {
    pub fn from_units(units: impl IntoIterator<Item = CompiledUnit>) -> Self {
        let units: BTreeMap<_, _> = units
            .into_iter()
            .map(|u| (u.identifier.clone(), u))
            .collect();
        let mut hasher = blake3::Hasher::new();
        for (id, unit) in &units {
            hasher.update(id.as_bytes());
            hasher.update(unit.source_hash.as_bytes());
        }
        Self {
            digest: hasher.finalize().to_hex().to_string(),
            units,
        }
    }

    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let text = fs::read_to_string(path).map_err(|e| ArchiveError::Io(path.to_path_buf(), e))?;
        serde_json::from_str(&text).map_err(|e| ArchiveError::Json(path.to_path_buf(), e))
    }

    /// Write atomically (temp file + rename) so readers never see half an archive.
    pub fn save(&self, path: &Path) -> Result<(), ArchiveError> {
        let io_err = |e| ArchiveError::Io(path.to_path_buf(), e);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json =
            serde_json::to_vec_pretty(self).map_err(|e| ArchiveError::Json(path.to_path_buf(), e))?;
        let tmp = path.with_extension("pack.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)
    }

    pub fn get(&self, identifier: &str) -> Option<&CompiledUnit> {
        self.units.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Packaging collaborator: turns a directory of compiled units into an archive.
pub trait Packager: Send + Sync {
    /// Pack every unit below `source_root` into `archive`, returning the unit count.
    fn pack(&self, source_root: &Path, archive: &Path) -> Result<usize, ArchiveError>;
}

/// Default packager writing [`UnitPack`] JSON archives.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackWriter;

impl Packager for PackWriter {
    fn pack(&self, source_root: &Path, archive: &Path) -> Result<usize, ArchiveError> {
        let units = collect_files(source_root, ARTIFACT_EXT)
            .iter()
            .map(|p| CompiledUnit::read(p))
            .collect::<Result<Vec<_>, _>>()?;
        let pack = UnitPack::from_units(units);
        pack.save(archive)?;
        Ok(pack.len())
    }
}

/// Archive holding the built-in runtime units.
pub fn runtime_pack() -> UnitPack {
    UnitPack::from_units([CompiledUnit {
        identifier: RUNTIME_BASE.to_string(),
        kind: UnitKind::Rule,
        is_abstract: true,
        constructible: true,
        extends: None,
        rules: Vec::new(),
        item: None,
        source_hash: env!("CARGO_PKG_VERSION").to_string(),
    }])
}
