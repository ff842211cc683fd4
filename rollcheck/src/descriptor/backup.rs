use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{ConfigError, atomic_write};

/// Suffix appended to the descriptor's file name for the backup copy.
const BACKUP_SUFFIX: &str = ".backup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    /// No backup was held; nothing changed.
    NothingHeld,
}

/// Snapshot of a deployment descriptor kept in a sibling file.
///
/// At most one backup is held at a time. `restore` consumes it and is a
/// no-op when nothing is held, so calling it repeatedly is safe. Runs
/// sharing one descriptor path must not overlap; there is no file lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBackup {
    original: PathBuf,
    backup: PathBuf,
    held: bool,
}

impl ConfigBackup {
    pub fn for_descriptor(path: &Path) -> Self {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "descriptor".into());
        name.push(BACKUP_SUFFIX);
        Self {
            original: path.to_path_buf(),
            backup: path.with_file_name(name),
            held: false,
        }
    }

    pub fn original_path(&self) -> &Path {
        &self.original
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Copy the descriptor to the backup path.
    pub fn backup(&mut self) -> Result<(), ConfigError> {
        if self.held {
            return Err(ConfigError::BackupAlreadyHeld(self.original.clone()));
        }
        if !self.original.is_file() {
            return Err(ConfigError::MissingDescriptor(self.original.clone()));
        }
        fs::copy(&self.original, &self.backup).map_err(|source| ConfigError::Backup {
            path: self.backup.clone(),
            source,
        })?;
        self.held = true;
        debug!(original = %self.original.display(), backup = %self.backup.display(), "Descriptor backed up");
        Ok(())
    }

    /// Put the backup back in place and delete it.
    pub fn restore(&mut self) -> Result<RestoreOutcome, ConfigError> {
        if !self.held {
            debug!(original = %self.original.display(), "No backup held, nothing to restore");
            return Ok(RestoreOutcome::NothingHeld);
        }
        let original = self.original.clone();
        let restore_err = |source| ConfigError::Restore {
            path: original.clone(),
            source,
        };
        let content = fs::read(&self.backup).map_err(restore_err)?;
        atomic_write(&self.original, &content).map_err(restore_err)?;
        self.held = false;
        fs::remove_file(&self.backup).map_err(restore_err)?;
        info!(original = %self.original.display(), "Descriptor restored from backup");
        Ok(RestoreOutcome::Restored)
    }

    /// Read the pristine copy held in the backup file.
    pub fn read_backup(&self) -> Result<String, ConfigError> {
        if !self.held {
            return Err(ConfigError::NoBackupHeld(self.original.clone()));
        }
        fs::read_to_string(&self.backup).map_err(|source| ConfigError::Backup {
            path: self.backup.clone(),
            source,
        })
    }

    /// Delete a backup file that is no longer held. Returns whether one existed.
    pub fn discard_leftover(&self) -> Result<bool, ConfigError> {
        if self.held || !self.backup.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.backup).map_err(|source| ConfigError::Write {
            path: self.backup.clone(),
            source,
        })?;
        debug!(backup = %self.backup.display(), "Removed leftover backup");
        Ok(true)
    }
}
