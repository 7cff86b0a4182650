//! Path utilities.
//!
//! - `resolve_path` - resolve a configured path against a base directory
//! - `collect_files` - recursive listing filtered by extension

use jwalk::WalkDir;
use std::path::{Path, PathBuf};

/// Resolve a configured path relative to `base`, expanding `~`.
///
/// Absolute paths are returned as-is.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let expanded = PathBuf::from(shellexpand::tilde(&raw).as_ref());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Check whether `path` has exactly the extension `ext` (without dot).
#[inline]
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

/// File stem as `&str`, empty when not valid UTF-8.
#[inline]
pub fn file_stem_str(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
}

/// Collect all files with extension `ext` below `dir`, recursively.
///
/// Sorted for deterministic batches. A missing directory yields nothing.
pub fn collect_files(dir: &Path, ext: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|p| has_extension(p, ext))
        .collect();
    files.sort();
    files
}

/// Collect files with extension `ext` directly inside `dir` (no recursion).
pub fn list_files(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_extension(p, ext))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_path_relative_and_absolute() {
        let base = Path::new("/srv/hotrules");
        assert_eq!(
            resolve_path(Path::new("rules"), base),
            PathBuf::from("/srv/hotrules/rules")
        );
        assert_eq!(
            resolve_path(Path::new("/etc/rules"), base),
            PathBuf::from("/etc/rules")
        );
    }

    #[test]
    fn test_collect_files_recursive_and_flat() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("Top.rule"), "").unwrap();
        std::fs::write(nested.join("Deep.rule"), "").unwrap();
        std::fs::write(nested.join("Deep.unit"), "").unwrap();

        let all = collect_files(temp.path(), "rule");
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|p| has_extension(p, "rule")));

        let flat = list_files(temp.path(), "rule");
        assert_eq!(flat, vec![temp.path().join("Top.rule")]);
    }

    #[test]
    fn test_collect_files_missing_dir() {
        assert!(collect_files(Path::new("/definitely/not/here"), "rule").is_empty());
    }
}
