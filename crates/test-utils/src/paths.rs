//! Temporary directory and file helpers.

use std::path::{Path, PathBuf};

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Creates empty files `dir/<name>` for every name, creating `dir` first.
///
/// Returns the created paths in the given order.
pub fn touch_files(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    std::fs::create_dir_all(dir).expect("Failed to create fixture directory");
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"").expect("Failed to create fixture file");
            path
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_test_dir() {
        let dir = temp_test_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_touch_files_creates_nested_dir() {
        let dir = temp_test_dir();
        let paths = touch_files(&dir.path().join("tiles/s2"), &["a.tif", "b.tif"]);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.is_file()));
    }
}
