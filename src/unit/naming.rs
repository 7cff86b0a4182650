//! Identifier derivation between artifact paths and qualified names.
//!
//! Compiled units live at `<root>/<namespace-as-path>/<Name>.unit`.
//! [`derive_identifier`] reads that layout back into `namespace.Name`,
//! [`artifact_path_for`] writes it.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use super::ARTIFACT_EXT;

#[derive(Debug, Error)]
pub enum NamingError {
    /// The configured base namespace does not occur in the artifact's directory.
    #[error("namespace `{namespace}` not found in path `{}`", path.display())]
    NamespaceNotFound { namespace: String, path: PathBuf },

    #[error("artifact path `{}` has no parent directory or file name", .0.display())]
    InvalidPath(PathBuf),
}

/// Derive `namespace.Name` from an artifact path and a known base namespace.
///
/// The parent directory is rendered with `.` separators, cut at the first
/// occurrence of `base_namespace`, and joined with the file stem.
///
/// ```text
/// /srv/classes/org/hotrules/rules/user/custom/Foo.unit, "org.hotrules.rules.user"
///   -> org.hotrules.rules.user.custom.Foo
/// ```
pub fn derive_identifier(artifact: &Path, base_namespace: &str) -> Result<String, NamingError> {
    let invalid = || NamingError::InvalidPath(artifact.to_path_buf());
    let parent = artifact.parent().ok_or_else(invalid)?;
    let stem = artifact
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(invalid)?;

    let dotted = dotted_directory(parent);
    let Some(start) = dotted.find(base_namespace) else {
        return Err(NamingError::NamespaceNotFound {
            namespace: base_namespace.to_string(),
            path: artifact.to_path_buf(),
        });
    };

    Ok(format!("{}.{}", &dotted[start..], stem))
}

/// Render a directory path as a dot-separated string of its normal components.
fn dotted_directory(dir: &Path) -> String {
    dir.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Split `a.b.Name` into `("a.b", "Name")`.
pub fn split_identifier(identifier: &str) -> (&str, &str) {
    identifier.rsplit_once('.').unwrap_or(("", identifier))
}

/// Directory holding every unit of `namespace` below `root`.
pub fn namespace_dir(root: &Path, namespace: &str) -> PathBuf {
    namespace
        .split('.')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |dir, part| dir.join(part))
}

/// Artifact location for `identifier` below `root`; inverse of [`derive_identifier`].
pub fn artifact_path_for(root: &Path, identifier: &str) -> PathBuf {
    let (namespace, name) = split_identifier(identifier);
    namespace_dir(root, namespace).join(format!("{name}.{ARTIFACT_EXT}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES_NS: &str = "org.hotrules.rules.user";

    #[test]
    fn test_derive_identifier_nested_package() {
        let path = Path::new(
            "/etc/hotrules/rule-classes/org/hotrules/rules/user/custom/pkg/MySuperDuper.unit",
        );
        assert_eq!(
            derive_identifier(path, RULES_NS).unwrap(),
            "org.hotrules.rules.user.custom.pkg.MySuperDuper"
        );
    }

    #[test]
    fn test_derive_identifier_directly_in_namespace() {
        let path = Path::new("/work/classes/org/hotrules/rules/user/Lights.unit");
        assert_eq!(
            derive_identifier(path, RULES_NS).unwrap(),
            "org.hotrules.rules.user.Lights"
        );
    }

    #[test]
    fn test_derive_identifier_strips_only_last_extension() {
        let path = Path::new("/c/org/hotrules/rules/user/Foo.unit");
        let id = derive_identifier(path, RULES_NS).unwrap();
        assert!(!id.ends_with(".unit"));
        assert!(id.ends_with(".Foo"));
    }

    #[test]
    fn test_derive_identifier_missing_namespace_is_error() {
        let path = Path::new("/c/com/other/Foo.unit");
        let err = derive_identifier(path, RULES_NS).unwrap_err();
        assert!(matches!(err, NamingError::NamespaceNotFound { .. }));
    }

    #[test]
    fn test_artifact_path_inverts_derivation() {
        let root = Path::new("/work/rule-classes");
        let id = "org.hotrules.rules.user.custom.Foo";
        let path = artifact_path_for(root, id);
        assert_eq!(
            path,
            PathBuf::from("/work/rule-classes/org/hotrules/rules/user/custom/Foo.unit")
        );
        assert_eq!(derive_identifier(&path, RULES_NS).unwrap(), id);
    }

    #[test]
    fn test_split_identifier() {
        assert_eq!(split_identifier("a.b.Name"), ("a.b", "Name"));
        assert_eq!(split_identifier("Name"), ("", "Name"));
    }
}
