//! Source units, compiled artifacts and the naming scheme between them.
//!
//! ```text
//! rules/lights/Hallway.rule                       (source, any nesting)
//!   -> rule-classes/org/hotrules/rules/user/Hallway.unit   (artifact, by namespace)
//! ```

pub mod artifact;
pub mod naming;
pub mod source;

pub use artifact::{Action, CompiledRule, CompiledUnit, ItemDecl, TriggerKind, UnitKind};
pub use naming::{NamingError, artifact_path_for, derive_identifier, namespace_dir};
pub use source::SourceUnit;

/// Extension of rule and item sources.
pub const SOURCE_EXT: &str = "rule";
/// Extension of compiled units.
pub const ARTIFACT_EXT: &str = "unit";
/// Extension of unit archives.
pub const ARCHIVE_EXT: &str = "pack";
/// Prefix of generated entity stubs (`_Name.rule`).
pub const STUB_PREFIX: &str = "_";
