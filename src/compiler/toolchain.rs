//! Toolchain abstraction and compile results.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::loader::ClassPath;
use crate::unit::SourceUnit;
use crate::unit::artifact::ArtifactError;

/// One compiler complaint, tied to a source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    /// 1-based; 0 when the toolchain gave no line.
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error on line {} in {}: {}",
            self.line,
            self.path.display(),
            self.message
        )
    }
}

/// What a toolchain run produced.
#[derive(Debug, Default)]
pub struct CompileOutcome {
    /// Number of sources in the batch.
    pub sources: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Artifacts written by this run; empty when the batch failed.
    pub written: Vec<PathBuf>,
}

impl CompileOutcome {
    pub fn succeeded(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// The toolchain could not run at all (as opposed to reporting diagnostics).
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("toolchain `{0}` not found in PATH")]
    NotFound(String, #[source] which::Error),

    #[error("toolchain command is empty")]
    EmptyCommand,

    #[error("failed to run toolchain")]
    Spawn(#[source] anyhow::Error),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("cannot prepare output directory `{}`", .0.display())]
    Output(PathBuf, #[source] std::io::Error),
}

/// Turns source units into compiled units under `output_root`.
///
/// A batch is all-or-nothing: when any diagnostic is reported, none of the
/// batch's artifacts may be relied upon.
pub trait Toolchain: Send + Sync {
    fn name(&self) -> &str;

    fn compile(
        &self,
        sources: &[SourceUnit],
        classpath: &ClassPath,
        output_root: &Path,
    ) -> Result<CompileOutcome, CompileError>;
}
