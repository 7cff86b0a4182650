//! Compilation orchestration.
//!
//! # Module Structure
//!
//! ```text
//! compiler/
//! ├── toolchain.rs   # Toolchain trait, Diagnostic, CompileOutcome
//! ├── native.rs      # built-in *.rule compiler
//! ├── external.rs    # out-of-process compiler command
//! └── mod.rs         # Compiler: batch, stale-only, items and rules passes
//! ```
//!
//! # Class paths
//!
//! | Pass     | Class path                                              |
//! |----------|---------------------------------------------------------|
//! | items    | runtime.pack                                            |
//! | rules    | items.pack, runtime.pack, ext-lib/*.pack                |
//! | loading  | rule-classes/, items.pack, runtime.pack, ext-lib/*.pack |

mod external;
mod native;
mod toolchain;

#[cfg(test)]
mod tests;

pub use external::{ExternalToolchain, parse_diagnostics};
pub use native::NativeToolchain;
pub use toolchain::{CompileError, CompileOutcome, Diagnostic, Toolchain};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::archive::runtime_pack;
use crate::config::Config;
use crate::loader::ClassPath;
use crate::unit::source::{scan_folder, scan_tree};
use crate::unit::{ARCHIVE_EXT, ARTIFACT_EXT, SourceUnit};
use crate::utils::path::{collect_files, file_stem_str, list_files};
use crate::{debug, log};

/// Pick the toolchain configured in `[toolchain]`.
pub fn toolchain_for(config: &Config) -> Result<Arc<dyn Toolchain>, CompileError> {
    if config.toolchain.command.is_empty() {
        Ok(Arc::new(NativeToolchain))
    } else {
        Ok(Arc::new(ExternalToolchain::new(&config.toolchain.command)?))
    }
}

/// Runs compile passes over the configured directories.
#[derive(Clone)]
pub struct Compiler {
    toolchain: Arc<dyn Toolchain>,
    config: Arc<Config>,
}

impl Compiler {
    pub fn new(config: Arc<Config>, toolchain: Arc<dyn Toolchain>) -> Self {
        Self { toolchain, config }
    }

    /// Compile one batch, logging every diagnostic.
    ///
    /// Diagnostics are not an `Err`: the outcome reports failure and the
    /// output directory must not be trusted as fresh.
    pub fn compile(
        &self,
        sources: &[SourceUnit],
        classpath: &ClassPath,
        output_root: &Path,
    ) -> Result<CompileOutcome, CompileError> {
        if sources.is_empty() {
            return Ok(CompileOutcome::default());
        }

        log!("compile"; "compiling {} source(s) with {}", sources.len(), self.toolchain.name());
        debug!("compile"; "class path: {}", classpath.to_arg().to_string_lossy());

        let outcome = self.toolchain.compile(sources, classpath, output_root)?;
        if outcome.succeeded() {
            debug!("compile"; "wrote {} artifact(s)", outcome.written.len());
        } else {
            for diagnostic in &outcome.diagnostics {
                log!("error"; "{}", diagnostic);
            }
            log!("compile"; "compilation failed with {} error(s)", outcome.diagnostics.len());
        }
        Ok(outcome)
    }

    /// Compile sources in `folder` that have no artifact of the same name there.
    ///
    /// Presence of a name is all that counts: a changed source next to an
    /// existing artifact is left alone. Callers that need a forced rebuild
    /// delete the artifacts first.
    pub fn compile_stale_only(
        &self,
        folder: &Path,
        classpath: &ClassPath,
        output_root: &Path,
    ) -> Result<CompileOutcome, CompileError> {
        let compiled: FxHashSet<String> = list_files(folder, ARTIFACT_EXT)
            .iter()
            .map(|p| file_stem_str(p).to_string())
            .collect();

        let stale: Vec<SourceUnit> = scan_folder(folder)
            .into_iter()
            .filter(|s| !compiled.contains(s.name()))
            .collect();

        if stale.is_empty() {
            debug!("compile"; "nothing stale in {}", folder.display());
            return Ok(CompileOutcome::default());
        }
        self.compile(&stale, classpath, output_root)
    }

    /// Compile item stubs that have no artifact yet.
    pub fn compile_items(&self) -> Result<CompileOutcome, CompileError> {
        let config = &self.config;
        self.compile_stale_only(
            &config.items_namespace_dir(),
            &items_classpath(config),
            config.items_dir(),
        )
    }

    /// Recompile every rule source from scratch.
    ///
    /// All existing rule artifacts are removed first, so renamed or deleted
    /// sources leave nothing behind even when no source remains.
    pub fn compile_rules(&self) -> Result<CompileOutcome, CompileError> {
        let config = &self.config;
        let removed = delete_artifacts(config.rule_classes_dir())?;
        debug!("compile"; "removed {} rule artifact(s)", removed);

        let sources = scan_tree(config.rules_dir());
        if sources.is_empty() {
            log!("compile"; "no rule sources in {}, skipping", config.rules_dir().display());
            return Ok(CompileOutcome::default());
        }
        self.compile(&sources, &rules_classpath(config), config.rule_classes_dir())
    }
}

/// Remove every compiled unit below `dir`, returning how many were removed.
pub fn delete_artifacts(dir: &Path) -> Result<usize, CompileError> {
    let files = collect_files(dir, ARTIFACT_EXT);
    for file in &files {
        fs::remove_file(file).map_err(|e| CompileError::Output(file.clone(), e))?;
    }
    Ok(files.len())
}

// ============================================================================
// class paths
// ============================================================================

fn push_runtime(cp: &mut ClassPath, config: &Config) {
    let path = config.runtime_pack();
    if let Err(e) = cp.push_pack(&path) {
        debug!("compile"; "runtime pack unavailable ({}), using built-in copy", e);
        cp.push_loaded_pack(path, runtime_pack());
    }
}

fn push_items(cp: &mut ClassPath, config: &Config) {
    let path = config.items_pack();
    if !path.exists() {
        debug!("compile"; "no items pack at {}", path.display());
        return;
    }
    if let Err(e) = cp.push_pack(&path) {
        log!("error"; "ignoring items pack: {:#}", anyhow::Error::from(e));
    }
}

/// Add every readable archive in the extlib directory.
fn push_extlibs(cp: &mut ClassPath, config: &Config) {
    for archive in list_files(config.extlib_dir(), ARCHIVE_EXT) {
        match cp.push_pack(&archive) {
            Ok(()) => debug!("compile"; "ext lib {}", archive.display()),
            Err(e) => log!("error"; "ignoring ext lib: {:#}", anyhow::Error::from(e)),
        }
    }
}

pub fn items_classpath(config: &Config) -> ClassPath {
    let mut cp = ClassPath::new();
    push_runtime(&mut cp, config);
    cp
}

pub fn rules_classpath(config: &Config) -> ClassPath {
    let mut cp = ClassPath::new();
    push_items(&mut cp, config);
    push_runtime(&mut cp, config);
    push_extlibs(&mut cp, config);
    cp
}

/// Class path for loading compiled rules into a new generation.
pub fn loader_classpath(config: &Config) -> ClassPath {
    let mut cp = ClassPath::new().with_dir(config.rule_classes_dir());
    push_items(&mut cp, config);
    push_runtime(&mut cp, config);
    push_extlibs(&mut cp, config);
    cp
}
