//! Backup orchestrator for DocVault
//!
//! Composes a full backup of both data roots into one timestamp-named archive.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info};

use super::inventory::{archive_file_name, format_size, BackupInfo};
use super::snapshot::snapshot;
use crate::archive::{ArchiveCodec, RootId};
use crate::config::paths::VaultPaths;
use crate::config::settings::Settings;
use crate::error::{VaultError, VaultResult};

/// Outcome of a backup request
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupResult {
    /// Whether the request completed without error
    pub success: bool,
    /// Whether an automatic backup was throttled; the path then names the existing archive
    pub skipped: bool,
    /// Path of the produced (or, when skipped, existing) archive
    pub file_path: Option<PathBuf>,
    /// Archive size in bytes
    pub file_size: u64,
    /// Error that ended the request
    pub error: Option<VaultError>,
}

impl BackupResult {
    /// A backup that produced `info`
    pub fn created(info: &BackupInfo) -> Self {
        Self {
            success: true,
            skipped: false,
            file_path: Some(info.path.clone()),
            file_size: info.size_bytes,
            error: None,
        }
    }

    /// An automatic backup skipped because `latest` is recent enough
    pub fn skipped(latest: &BackupInfo) -> Self {
        Self {
            skipped: true,
            ..Self::created(latest)
        }
    }

    /// A failed backup
    pub fn failed(error: VaultError) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Human-readable error message, if the backup failed
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    /// One-line description of the outcome
    pub fn summary(&self) -> String {
        let path = self
            .file_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        if !self.success {
            format!(
                "Backup failed: {}",
                self.error_message().unwrap_or_else(|| "unknown error".into())
            )
        } else if self.skipped {
            format!("Backup skipped: recent backup exists at {}", path)
        } else {
            format!("Backup created: {} ({})", path, format_size(self.file_size))
        }
    }
}

/// Builds archives of the two data roots
#[derive(Debug, Clone)]
pub struct BackupManager {
    paths: VaultPaths,
    codec: ArchiveCodec,
}

impl BackupManager {
    /// Create a new BackupManager
    pub fn new(paths: VaultPaths, settings: &Settings) -> Self {
        let codec = ArchiveCodec::new(settings.compression_level, &settings.structured_extension);
        Self { paths, codec }
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    /// Back up both data roots into `target_dir` (default: the manual backup directory)
    ///
    /// An existing archive with the same name is replaced.
    pub fn create_backup(
        &self,
        target_dir: Option<&Path>,
        now: DateTime<Local>,
    ) -> VaultResult<BackupInfo> {
        self.create_backup_inner(target_dir, now, None)
    }

    /// Like [`create_backup`](Self::create_backup), but never writes to `protected`
    ///
    /// Used for safety backups so the archive about to be restored is not replaced
    /// by a same-second backup.
    pub(crate) fn create_backup_protecting(
        &self,
        target_dir: Option<&Path>,
        now: DateTime<Local>,
        protected: &Path,
    ) -> VaultResult<BackupInfo> {
        self.create_backup_inner(target_dir, now, Some(protected))
    }

    fn create_backup_inner(
        &self,
        target_dir: Option<&Path>,
        now: DateTime<Local>,
        protected: Option<&Path>,
    ) -> VaultResult<BackupInfo> {
        let data_dir = self.paths.data_dir();
        let photos_dir = self.paths.photos_dir();

        if !data_dir.is_dir() && !photos_dir.is_dir() {
            return Err(VaultError::NoData(format!(
                "neither {} nor {} exists",
                data_dir.display(),
                photos_dir.display()
            )));
        }

        let target_dir = target_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.paths.backup_dir());

        // Writing inside a root would snapshot the archive into itself
        if self.paths.is_inside_data_root(&target_dir) {
            return Err(VaultError::Config(format!(
                "backup directory {} is inside a data root",
                target_dir.display()
            )));
        }

        fs::create_dir_all(&target_dir).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create backup directory {}: {}",
                target_dir.display(),
                e
            ))
        })?;

        let backup_path = unprotected_path(&target_dir, now, protected);
        debug!(path = %backup_path.display(), "writing backup archive");

        let entries = snapshot(&data_dir, RootId::Data).chain(snapshot(&photos_dir, RootId::Photos));
        let size_bytes = self.codec.write(&backup_path, entries)?;

        let filename = backup_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let is_auto = target_dir == self.paths.auto_backup_dir();

        info!(
            path = %backup_path.display(),
            size = size_bytes,
            auto = is_auto,
            "backup created"
        );

        Ok(BackupInfo {
            filename,
            path: backup_path,
            created_at: now,
            size_bytes,
            is_auto,
        })
    }
}

/// Archive path for `now` in `dir` that differs from `protected`
fn unprotected_path(dir: &Path, now: DateTime<Local>, protected: Option<&Path>) -> PathBuf {
    let candidate = dir.join(archive_file_name(now, None));
    let Some(protected) = protected else {
        return candidate;
    };

    let collides = |path: &Path| {
        path == protected
            || matches!(
                (path.canonicalize(), protected.canonicalize()),
                (Ok(a), Ok(b)) if a == b
            )
    };

    if !collides(&candidate) {
        return candidate;
    }

    (1..)
        .map(|n| dir.join(archive_file_name(now, Some(n))))
        .find(|path| !path.exists() && !collides(path))
        .unwrap_or(candidate)
}
