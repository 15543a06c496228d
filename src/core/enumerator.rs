use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Walks the project source tree, producing the file set consumed by the
/// pattern rule engine and counted for summary statistics.
pub struct SourceEnumerator {
    /// Extensions (without the dot) considered source files
    extensions: Vec<String>,

    /// Directory names skipped wholesale (dependency and build output)
    exclude_dirs: Vec<String>,
}

impl SourceEnumerator {
    pub fn new(extensions: Vec<String>, exclude_dirs: Vec<String>) -> Self {
        Self {
            extensions,
            exclude_dirs,
        }
    }

    /// Recursively enumerate source files under `root`. Unreadable
    /// subdirectories are logged and skipped; enumeration never fails the
    /// whole run for one bad directory.
    pub fn enumerate(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                !self.exclude_dirs.iter().any(|d| d == name.as_ref())
            } else {
                true
            }
        });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable path during enumeration: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if self.has_source_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn enumerator() -> SourceEnumerator {
        SourceEnumerator::new(
            vec!["ts".to_string(), "tsx".to_string()],
            vec!["node_modules".to_string(), "dist".to_string()],
        )
    }

    #[test]
    fn test_enumerate_filters_extensions() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("app.ts").write_str("let x = 1;").unwrap();
        temp.child("view.tsx").write_str("let y = 2;").unwrap();
        temp.child("README.md").write_str("# readme").unwrap();
        temp.child("style.css").write_str("body {}").unwrap();

        let files = enumerator().enumerate(temp.path());
        let mut names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();

        assert_eq!(names, vec!["app.ts", "view.tsx"]);
    }

    #[test]
    fn test_enumerate_skips_excluded_dirs() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/main.ts").write_str("let x = 1;").unwrap();
        temp.child("node_modules/pkg/index.ts")
            .write_str("module.exports = {};")
            .unwrap();
        temp.child("dist/out.ts").write_str("let y = 2;").unwrap();

        let files = enumerator().enumerate(temp.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/main.ts"));
    }

    #[test]
    fn test_enumerate_missing_root_is_empty() {
        let temp = assert_fs::TempDir::new().unwrap();
        let files = enumerator().enumerate(&temp.path().join("does-not-exist"));
        assert!(files.is_empty());
    }
}
