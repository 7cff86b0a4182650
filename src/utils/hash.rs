//! Content hashing using blake3.
//!
//! Used for write-if-changed stub generation and archive digests.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a hash representing "no content" (all zeros).
    #[inline]
    pub const fn empty() -> Self {
        Self([0; 32])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 32]
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Hash an in-memory buffer.
    pub fn of<T: AsRef<[u8]> + ?Sized>(data: &T) -> Self {
        Self(*blake3::hash(data.as_ref()).as_bytes())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Compute blake3 hash of file contents.
///
/// Missing or unreadable files hash to [`ContentHash::empty`].
pub fn compute_file_hash(path: &Path) -> ContentHash {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return ContentHash::empty(),
    };

    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return ContentHash::empty(),
        }
    }

    ContentHash::new(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_hash_matches_buffer_hash() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Lamp.rule");
        std::fs::write(&path, "package = \"a\"").unwrap();
        assert_eq!(compute_file_hash(&path), ContentHash::of("package = \"a\""));
    }

    #[test]
    fn test_missing_file_is_empty() {
        assert!(compute_file_hash(Path::new("/no/such/file.rule")).is_empty());
    }

    #[test]
    fn test_display_is_truncated_hex() {
        let hash = ContentHash::of("x");
        assert_eq!(hash.to_string().len(), 16);
        assert_eq!(hash.to_hex().len(), 64);
    }
}
