//! Path utilities for test data and scratch space.

use std::path::{Path, PathBuf};

/// Creates a temporary directory for test output.
///
/// The directory is removed when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Writes `contents` to `dir/name`, creating parent directories as needed.
pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    std::fs::write(&path, contents).expect("Failed to write fixture file");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_file_creates_parents() {
        let dir = temp_test_dir();
        let path = write_file(dir.path(), "a/b/c.gpx", "<gpx/>");
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<gpx/>");
    }
}
