//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /srv/automation/rules/lights/   ← cwd
/// /srv/automation/hotrules.toml   ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    find_config_from(&cwd, config_name)
}

/// Walk up from `start` looking for `config_name`.
fn find_config_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Check `a.b.c` namespace syntax: dot-separated identifiers.
pub fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Entity names become stub file names: one identifier, no dots.
pub fn is_valid_entity_name(name: &str) -> bool {
    !name.contains('.') && is_valid_namespace(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_walks_up() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("rules/lights");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("hotrules.toml"), "").unwrap();

        let found = find_config_from(&nested, Path::new("hotrules.toml")).unwrap();
        assert_eq!(found, temp.path().join("hotrules.toml"));
    }

    #[test]
    fn test_find_config_absent() {
        let temp = TempDir::new().unwrap();
        assert!(find_config_from(temp.path(), Path::new("no-such-config-file.toml")).is_none());
    }

    #[test]
    fn test_namespace_syntax() {
        assert!(is_valid_namespace("org.hotrules.rules.user"));
        assert!(is_valid_namespace("_private.x1"));
        assert!(!is_valid_namespace(""));
        assert!(!is_valid_namespace("org..rules"));
        assert!(!is_valid_namespace("org.1rules"));
        assert!(!is_valid_namespace("org/rules"));
    }

    #[test]
    fn test_entity_name_syntax() {
        assert!(is_valid_entity_name("Lamp_1"));
        assert!(!is_valid_entity_name("a.b"));
        assert!(!is_valid_entity_name("../Escape"));
        assert!(!is_valid_entity_name("sub/Lamp"));
        assert!(!is_valid_entity_name(""));
    }
}
