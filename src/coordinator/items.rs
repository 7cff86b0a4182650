//! Item stubs and the items archive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;

use super::Shared;
use super::state::State;
use crate::config::is_valid_entity_name;
use crate::entity::{Entity, RegistryEvent, stub_file_name, stub_identifier};
use crate::unit::{SOURCE_EXT, STUB_PREFIX, artifact_path_for};
use crate::utils::hash::{ContentHash, compute_file_hash};
use crate::utils::path::{file_stem_str, list_files};
use crate::{debug, log};

/// Remove a file, treating "already gone" as success.
fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

impl Shared {
    fn stub_path(&self, entity_name: &str) -> PathBuf {
        self.config
            .items_namespace_dir()
            .join(stub_file_name(entity_name))
    }

    fn stub_artifact(&self, entity_name: &str) -> PathBuf {
        artifact_path_for(
            self.config.items_dir(),
            &stub_identifier(&self.config.namespace.items, entity_name),
        )
    }

    /// Write the stub of `entity` if its content changed.
    ///
    /// A rewritten stub loses its artifact so the next stale-only pass
    /// recompiles it. Returns whether anything changed.
    fn write_stub(&self, entity: &Entity) -> Result<bool> {
        let path = self.stub_path(&entity.name);
        let content = self
            .stubs
            .render(entity, &self.config.namespace.items);

        if compute_file_hash(&path) == ContentHash::of(&content) {
            debug!("items"; "stub unchanged: {}", entity.name);
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, &content)
            .with_context(|| format!("failed to write stub {}", path.display()))?;
        let artifact = self.stub_artifact(&entity.name);
        remove_if_exists(&artifact)
            .with_context(|| format!("failed to remove {}", artifact.display()))?;
        debug!("items"; "stub written: {}", path.display());
        Ok(true)
    }

    /// Delete the stub and artifact of `entity_name`.
    fn remove_stub(&self, entity_name: &str) -> Result<bool> {
        let stub = self.stub_path(entity_name);
        let artifact = self.stub_artifact(entity_name);
        let removed_stub = remove_if_exists(&stub)
            .with_context(|| format!("failed to remove {}", stub.display()))?;
        let removed_artifact = remove_if_exists(&artifact)
            .with_context(|| format!("failed to remove {}", artifact.display()))?;
        Ok(removed_stub || removed_artifact)
    }

    /// Write a stub for every registered entity and drop stubs of entities
    /// that are gone.
    pub(super) fn generate_all_stubs(&self, state: &mut State) {
        let entities = self.registry.entities();
        let known: FxHashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();

        let mut written = 0;
        for entity in &entities {
            if !is_valid_entity_name(&entity.name) {
                log!("error"; "entity `{}`: not a valid item name, skipped", entity.name);
                continue;
            }
            match self.write_stub(entity) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => log!("error"; "{:#}", e),
            }
        }

        let folder = self.config.items_namespace_dir();
        let mut removed = 0;
        for stub in list_files(&folder, SOURCE_EXT) {
            let Some(name) = file_stem_str(&stub).strip_prefix(STUB_PREFIX) else {
                continue;
            };
            if known.contains(name) {
                continue;
            }
            match self.remove_stub(name) {
                Ok(_) => removed += 1,
                Err(e) => log!("error"; "{:#}", e),
            }
        }

        if written + removed > 0 {
            state.items_stale = true;
        }
        log!(
            "items";
            "{} entities, {} stub(s) written, {} removed",
            entities.len(),
            written,
            removed
        );
    }

    /// Apply one registry notification to the stubs on disk.
    pub(super) fn apply_registry_event(&self, state: &mut State, event: &RegistryEvent) {
        let name = event.entity_name();
        if !is_valid_entity_name(name) {
            log!("error"; "entity `{}`: not a valid item name, ignored", name);
            return;
        }

        let result = match event {
            RegistryEvent::Removed(name) => {
                debug!("items"; "entity removed: {}", name);
                self.remove_stub(name).map(|_| true)
            }
            RegistryEvent::Added(entity) | RegistryEvent::Updated(entity) => {
                debug!("items"; "entity changed: {}", entity.name);
                self.write_stub(entity)
            }
        };

        match result {
            Ok(true) => state.items_stale = true,
            Ok(false) => {}
            Err(e) => log!("error"; "{}: {:#}", name, e),
        }
    }

    /// Recompile stale item stubs and repack the items archive.
    ///
    /// The stale flag is cleared only when both steps succeed.
    pub(super) fn rebuild_items(&self, state: &mut State) -> bool {
        if !state.items_stale {
            return true;
        }

        let outcome = match self.compiler.compile_items() {
            Ok(outcome) => outcome,
            Err(e) => {
                log!("error"; "items compilation failed: {:#}", anyhow::Error::from(e));
                return false;
            }
        };
        if !outcome.succeeded() {
            return false;
        }

        let archive = self.config.items_pack();
        match self.packager.pack(self.config.items_dir(), &archive) {
            Ok(count) => {
                log!("items"; "packed {} item(s) into {}", count, archive.display());
                state.items_stale = false;
                true
            }
            Err(e) => {
                log!("error"; "failed to pack items: {:#}", anyhow::Error::from(e));
                false
            }
        }
    }
}
