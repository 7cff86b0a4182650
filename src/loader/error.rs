use thiserror::Error;

use crate::archive::ArchiveError;
use crate::unit::NamingError;
use crate::unit::artifact::ArtifactError;

/// Per-artifact load failures. None of them aborts a batch.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("type `{0}` not found on the class path")]
    NotFound(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("`{0}` is abstract")]
    Abstract(String),

    #[error("`{0}` has no zero-argument constructor")]
    NoConstructor(String),

    #[error("base type `{base}` of `{identifier}` cannot be resolved")]
    UnresolvedBase { identifier: String, base: String },

    #[error("inheritance cycle through `{0}`")]
    Cycle(String),
}
