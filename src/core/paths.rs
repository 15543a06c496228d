use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path, resolving `.` and `..` components without
/// touching the filesystem. Used for scope checks so that a path like
/// `root/../../secret` cannot dodge the boundary by never existing.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Whether `path`, normalized, falls under `root` (also normalized)
pub fn is_within(path: &Path, root: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_resolves_parent_dirs() {
        assert_eq!(
            normalize(Path::new("/project/src/../etc/passwd")),
            PathBuf::from("/project/etc/passwd")
        );
        assert_eq!(
            normalize(Path::new("/a/b/./c")),
            PathBuf::from("/a/b/c")
        );
    }

    #[test]
    fn test_is_within() {
        let root = Path::new("/project/src");
        assert!(is_within(Path::new("/project/src/app.ts"), root));
        assert!(is_within(Path::new("/project/src/sub/../app.ts"), root));
        assert!(!is_within(Path::new("/project/src/../secret"), root));
        assert!(!is_within(Path::new("/etc/passwd"), root));
    }
}
