//! Artifact loading.
//!
//! Walks a directory of compiled units, resolves each one through a
//! [`ClassPath`] and optionally instantiates it. Every failure is per
//! artifact: it is logged, recorded in the [`LoadReport`] and the batch
//! goes on.

mod classpath;
mod error;
mod types;

pub use classpath::ClassPath;
pub use error::LoadError;
pub use types::{Constructor, LoadedType, RuleInstance};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::unit::{ARTIFACT_EXT, derive_identifier};
use crate::utils::path::collect_files;
use crate::{debug, log};

/// Why an artifact produced no instance.
#[derive(Debug)]
pub enum SkipReason {
    Abstract,
    NoConstructor,
}

/// Result of one [`load`] pass.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub types: Vec<Arc<LoadedType>>,
    pub instances: Vec<Arc<RuleInstance>>,
    pub skipped: Vec<(String, SkipReason)>,
    pub failed: Vec<(PathBuf, LoadError)>,
}

impl LoadReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Load every compiled unit below `artifact_dir`.
///
/// Identifiers are derived from paths relative to `base_namespace`. With
/// `instantiate`, abstract types and types without a constructor are
/// skipped quietly; instantiation failures are logged and skipped.
pub fn load(
    classpath: &ClassPath,
    artifact_dir: &Path,
    base_namespace: &str,
    instantiate: bool,
) -> LoadReport {
    let mut report = LoadReport::default();

    for path in collect_files(artifact_dir, ARTIFACT_EXT) {
        let ty = match derive_identifier(&path, base_namespace)
            .map_err(LoadError::from)
            .and_then(|id| classpath.resolve(&id))
        {
            Ok(ty) => ty,
            Err(e) => {
                log!("load"; "failed to load {}: {}", path.display(), e);
                report.failed.push((path, e));
                continue;
            }
        };
        debug!("load"; "resolved {}", ty.identifier());

        if instantiate {
            if ty.is_abstract() {
                debug!("load"; "skipping abstract {}", ty.identifier());
                report
                    .skipped
                    .push((ty.identifier().to_string(), SkipReason::Abstract));
            } else if ty.constructor().is_none() {
                debug!("load"; "skipping {}: no zero-argument constructor", ty.identifier());
                report
                    .skipped
                    .push((ty.identifier().to_string(), SkipReason::NoConstructor));
            } else {
                match ty.instantiate(classpath) {
                    Ok(instance) => report.instances.push(Arc::new(instance)),
                    Err(e) => {
                        log!("load"; "cannot instantiate {}: {}", ty.identifier(), e);
                        report.failed.push((path, e));
                    }
                }
            }
        }

        report.types.push(ty);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{CompiledUnit, UnitKind};
    use tempfile::TempDir;

    const NS: &str = "org.hotrules.rules.user";

    fn write_unit(root: &Path, name: &str, is_abstract: bool, constructible: bool) {
        CompiledUnit {
            identifier: format!("{NS}.{name}"),
            kind: UnitKind::Rule,
            is_abstract,
            constructible,
            extends: None,
            rules: Vec::new(),
            item: None,
            source_hash: String::new(),
        }
        .write(root)
        .unwrap();
    }

    #[test]
    fn test_instantiate_skips_abstract_and_data_types() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_unit(root, "Concrete", false, true);
        write_unit(root, "Base", true, true);
        write_unit(root, "Holder", false, false);

        let cp = ClassPath::new().with_dir(root);
        let report = load(&cp, root, NS, true);

        assert_eq!(report.types.len(), 3);
        assert_eq!(report.instances.len(), 1);
        assert_eq!(report.instances[0].identifier(), format!("{NS}.Concrete"));
        assert_eq!(report.skipped.len(), 2);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_resolve_only_keeps_all_types() {
        let temp = TempDir::new().unwrap();
        write_unit(temp.path(), "Base", true, true);
        write_unit(temp.path(), "Holder", false, false);

        let cp = ClassPath::new().with_dir(temp.path());
        let report = load(&cp, temp.path(), NS, false);

        assert_eq!(report.types.len(), 2);
        assert!(report.instances.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_failures_do_not_abort_batch() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_unit(root, "Good", false, true);
        // Outside the namespace and malformed: both fail independently.
        std::fs::create_dir_all(root.join("com/other")).unwrap();
        std::fs::write(root.join("com/other/Stray.unit"), "{}").unwrap();
        let broken = crate::unit::artifact_path_for(root, &format!("{NS}.Broken"));
        std::fs::write(&broken, "{ not json").unwrap();

        let cp = ClassPath::new().with_dir(root);
        let report = load(&cp, root, NS, true);

        assert_eq!(report.instances.len(), 1);
        assert_eq!(report.failed.len(), 2);
        assert!(
            report
                .failed
                .iter()
                .any(|(_, e)| matches!(e, LoadError::Naming(_)))
        );
    }
}
