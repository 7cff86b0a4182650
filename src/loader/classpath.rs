//! Class path: ordered artifact directories and unit archives.
//!
//! Lookups walk the entries in order and the first hit wins. Resolved types
//! are cached per class path; a reload builds a fresh class path, so a
//! generation never sees handles from the previous one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::LoadError;
use super::types::LoadedType;
use crate::archive::{ArchiveError, UnitPack};
use crate::debug;
use crate::unit::{ARTIFACT_EXT, CompiledUnit, UnitKind, artifact_path_for};
use crate::utils::path::collect_files;

#[derive(Debug)]
enum Entry {
    /// Directory laid out as `<ns-as-path>/<Name>.unit`.
    Dir(PathBuf),
    /// Archive loaded into memory.
    Pack(PathBuf, UnitPack),
}

impl Entry {
    fn path(&self) -> &Path {
        match self {
            Self::Dir(path) | Self::Pack(path, _) => path,
        }
    }
}

#[derive(Debug, Default)]
pub struct ClassPath {
    entries: Vec<Entry>,
    cache: Mutex<FxHashMap<String, Arc<LoadedType>>>,
    /// item name -> identifier of the stub declaring it
    items: OnceLock<FxHashMap<String, String>>,
}

impl ClassPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.push_dir(dir);
        self
    }

    pub fn with_pack(mut self, archive: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        self.push_pack(archive)?;
        Ok(self)
    }

    pub fn push_dir(&mut self, dir: impl Into<PathBuf>) {
        self.entries.push(Entry::Dir(dir.into()));
        self.invalidate();
    }

    /// Open and append an archive; unreadable archives are an error.
    pub fn push_pack(&mut self, archive: impl Into<PathBuf>) -> Result<(), ArchiveError> {
        let path = archive.into();
        let pack = UnitPack::open(&path)?;
        self.entries.push(Entry::Pack(path, pack));
        self.invalidate();
        Ok(())
    }

    /// Append an archive that is already in memory.
    pub fn push_loaded_pack(&mut self, path: impl Into<PathBuf>, pack: UnitPack) {
        self.entries.push(Entry::Pack(path.into(), pack));
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.cache.get_mut().clear();
        self.items = OnceLock::new();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(Entry::path)
    }

    /// Platform path-list rendering for an external toolchain.
    pub fn to_arg(&self) -> OsString {
        std::env::join_paths(self.paths()).unwrap_or_else(|_| {
            // A path containing the separator; fall back to a plain join.
            let joined: Vec<_> = self.paths().map(|p| p.to_string_lossy()).collect();
            OsString::from(joined.join(":"))
        })
    }

    /// Raw unit lookup, first entry wins.
    pub fn find_unit(&self, identifier: &str) -> Result<Option<CompiledUnit>, LoadError> {
        for entry in &self.entries {
            match entry {
                Entry::Dir(dir) => {
                    let path = artifact_path_for(dir, identifier);
                    if path.is_file() {
                        return Ok(Some(CompiledUnit::read(&path)?));
                    }
                }
                Entry::Pack(_, pack) => {
                    if let Some(unit) = pack.get(identifier) {
                        return Ok(Some(unit.clone()));
                    }
                }
            }
        }
        Ok(None)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        matches!(self.find_unit(identifier), Ok(Some(_)))
    }

    /// Identifier of the item unit declaring `item_name`.
    pub fn find_item(&self, item_name: &str) -> Option<&str> {
        self.items
            .get_or_init(|| self.index_items())
            .get(item_name)
            .map(String::as_str)
    }

    fn index_items(&self) -> FxHashMap<String, String> {
        let mut index = FxHashMap::default();
        let mut add = |unit: &CompiledUnit| {
            if unit.kind == UnitKind::Item
                && let Some(item) = &unit.item
            {
                index
                    .entry(item.name.clone())
                    .or_insert_with(|| unit.identifier.clone());
            }
        };

        for entry in &self.entries {
            match entry {
                Entry::Dir(dir) => {
                    for path in collect_files(dir, ARTIFACT_EXT) {
                        match CompiledUnit::read(&path) {
                            Ok(unit) => add(&unit),
                            Err(e) => debug!("load"; "skipping {}: {}", path.display(), e),
                        }
                    }
                }
                Entry::Pack(_, pack) => pack.units.values().for_each(&mut add),
            }
        }
        index
    }

    /// Resolve a type handle, cached for the lifetime of this class path.
    pub fn resolve(&self, identifier: &str) -> Result<Arc<LoadedType>, LoadError> {
        if let Some(ty) = self.cache.lock().get(identifier) {
            return Ok(Arc::clone(ty));
        }

        let unit = self
            .find_unit(identifier)?
            .ok_or_else(|| LoadError::NotFound(identifier.to_string()))?;
        let ty = Arc::new(LoadedType::new(unit));

        let mut cache = self.cache.lock();
        let entry = cache
            .entry(identifier.to_string())
            .or_insert_with(|| Arc::clone(&ty));
        Ok(Arc::clone(entry))
    }
}
