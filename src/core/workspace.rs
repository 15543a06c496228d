use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TriageError};
use super::paths;

/// Handle to the pre-overwrite copy of a file, created during fix
/// application so the caller can offer rollback. `backup_path` is `None`
/// when the backup itself failed; the primary write still went through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRef {
    pub original_path: PathBuf,
    pub backup_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

/// The only sanctioned file-mutation entry points. Every path is checked
/// against the configured source root before any I/O; anything outside is a
/// hard `PathViolation`.
///
/// Concurrent writes to the same file are not coordinated here; the
/// filesystem's last-write-wins applies. Backups are append-only and never
/// deleted by this subsystem.
pub struct ScopedWorkspace {
    source_root: PathBuf,
    backup_dir: PathBuf,
}

impl ScopedWorkspace {
    pub fn new(source_root: PathBuf, backup_dir: PathBuf) -> Self {
        Self {
            source_root,
            backup_dir,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Resolve a path against the source root, rejecting anything that
    /// escapes it. Relative paths are taken as root-relative.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.source_root.join(path)
        };

        if !paths::is_within(&candidate, &self.source_root) {
            return Err(TriageError::PathViolation {
                path: path.to_path_buf(),
            });
        }

        Ok(paths::normalize(&candidate))
    }

    /// Read a file under the source root
    pub fn read_scoped(&self, path: &Path) -> Result<String> {
        let resolved = self.resolve(path)?;
        Ok(std::fs::read_to_string(resolved)?)
    }

    /// Overwrite a file under the source root, capturing its current content
    /// into a uniquely named backup first. Backup failure is logged and does
    /// not block the primary write: the system's duty is forward progress
    /// with an audit trail, not guaranteed rollback.
    pub fn write_scoped(&self, path: &Path, new_content: &str) -> Result<BackupRef> {
        let resolved = self.resolve(path)?;

        let backup_path = match self.backup_current(&resolved) {
            Ok(p) => p,
            Err(e) => {
                warn!("Backup of {} failed, writing anyway: {}", resolved.display(), e);
                None
            }
        };

        std::fs::write(&resolved, new_content)?;
        info!("Applied fix to {}", resolved.display());

        Ok(BackupRef {
            original_path: resolved,
            backup_path,
            created_at: Utc::now(),
        })
    }

    /// Restore a file from its backup
    pub fn rollback(&self, backup: &BackupRef) -> Result<()> {
        let Some(ref backup_path) = backup.backup_path else {
            return Err(TriageError::Backup(format!(
                "no backup exists for {}",
                backup.original_path.display()
            )));
        };
        let content = std::fs::read_to_string(backup_path)?;
        std::fs::write(&backup.original_path, content)?;
        info!("Rolled back {} from {}", backup.original_path.display(), backup_path.display());
        Ok(())
    }

    fn backup_current(&self, resolved: &Path) -> Result<Option<PathBuf>> {
        // A brand-new file has nothing to back up
        if !resolved.exists() {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.backup_dir)
            .map_err(|e| TriageError::Backup(e.to_string()))?;

        let base_name = resolved
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unnamed".to_string());
        let backup_path = self
            .backup_dir
            .join(format!("{}.{}.bak", base_name, Utc::now().timestamp_millis()));

        let current = std::fs::read(resolved).map_err(|e| TriageError::Backup(e.to_string()))?;
        std::fs::write(&backup_path, current).map_err(|e| TriageError::Backup(e.to_string()))?;

        Ok(Some(backup_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace(temp: &TempDir) -> ScopedWorkspace {
        let root = temp.path().join("src");
        std::fs::create_dir_all(&root).unwrap();
        ScopedWorkspace::new(root, temp.path().join("backups"))
    }

    #[test]
    fn test_read_outside_root_is_path_violation() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);

        for outside in ["/etc/passwd", "../../secret", "../sibling.txt"] {
            let err = ws.read_scoped(Path::new(outside)).unwrap_err();
            assert!(
                matches!(err, TriageError::PathViolation { .. }),
                "expected PathViolation for {outside}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_write_outside_root_performs_no_io() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);

        let err = ws
            .write_scoped(Path::new("../../escape.txt"), "nope")
            .unwrap_err();
        assert!(matches!(err, TriageError::PathViolation { .. }));
        assert!(!temp.path().join("escape.txt").exists());
        // No backup directory appears either
        assert!(!temp.path().join("backups").exists());
    }

    #[test]
    fn test_backup_before_overwrite() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);

        let file = ws.source_root().join("app.ts");
        std::fs::write(&file, "A").unwrap();

        let backup = ws.write_scoped(Path::new("app.ts"), "B").unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "B");
        let backup_path = backup.backup_path.expect("backup should exist");
        assert_eq!(std::fs::read_to_string(&backup_path).unwrap(), "A");
        assert!(backup_path.starts_with(temp.path().join("backups")));
    }

    #[test]
    fn test_write_new_file_has_no_backup() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);

        let backup = ws.write_scoped(Path::new("fresh.ts"), "hello").unwrap();
        assert!(backup.backup_path.is_none());
        assert_eq!(
            std::fs::read_to_string(ws.source_root().join("fresh.ts")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_rollback_restores_original() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);

        let file = ws.source_root().join("app.ts");
        std::fs::write(&file, "original").unwrap();

        let backup = ws.write_scoped(Path::new("app.ts"), "patched").unwrap();
        ws.rollback(&backup).unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "original");
    }

    #[test]
    fn test_absolute_path_inside_root_is_accepted() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);

        let file = ws.source_root().join("abs.ts");
        std::fs::write(&file, "content").unwrap();

        assert_eq!(ws.read_scoped(&file).unwrap(), "content");
    }
}
