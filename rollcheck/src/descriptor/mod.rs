//! Deployment descriptor handling: backup, restore and failure injection.

mod backup;
mod inject;

pub use backup::{ConfigBackup, RestoreOutcome};
pub use inject::{BROKEN_DOCKERFILE, INVALID_ENV_ENTRY, InjectMode, inject};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Descriptor I/O failures. Any of these aborts the scenario.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Deployment descriptor not found: {0}")]
    MissingDescriptor(PathBuf),

    #[error("A backup of {0} is already held")]
    BackupAlreadyHeld(PathBuf),

    #[error("No backup of {0} is held; back up before injecting")]
    NoBackupHeld(PathBuf),

    #[error("Failed to back up {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to restore {path}: {source}")]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render broken descriptor: {0}")]
    Render(String),
}

/// Replace `path` with `content` through a temporary sibling file.
///
/// A symlinked `path` is written through to its target, and the target's
/// permissions carry over to the replacement.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let permissions = fs::metadata(&target).ok().map(|m| m.permissions());
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(content)?;
    if let Some(permissions) = permissions {
        file.as_file().set_permissions(permissions)?;
    }
    file.as_file().sync_all()?;
    file.persist(&target).map_err(|e| e.error)?;
    Ok(())
}
