//! Backup restoration for DocVault
//!
//! A restore runs in four phases:
//!
//! 1. Validate the archive (non-destructive)
//! 2. Take a safety backup of the live data
//! 3. Resolve the archive's layout
//! 4. Clear the affected data roots and extract the archive into them
//!
//! Phase 4 accepts a [`SafetyBackup`], which only phase 2 can produce, so the
//! roots cannot be cleared before the current state has been captured.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use super::inventory::BackupInfo;
use super::manager::BackupManager;
use super::snapshot::clear;
use crate::archive::{ArchiveCodec, ArchiveSummary, ExtractStats, LayoutVersion, RootId};
use crate::config::paths::VaultPaths;
use crate::config::settings::Settings;
use crate::error::{VaultError, VaultResult};

/// Proof that the live data was captured before a destructive restore
#[derive(Debug, Clone)]
pub struct SafetyBackup {
    /// None when there was no data to capture
    archive: Option<BackupInfo>,
}

impl SafetyBackup {
    /// Path of the safety archive, if one was written
    pub fn path(&self) -> Option<&Path> {
        self.archive.as_ref().map(|a| a.path.as_path())
    }

    pub fn info(&self) -> Option<&BackupInfo> {
        self.archive.as_ref()
    }
}

/// Handles restoring from backups
pub struct RestoreManager {
    paths: VaultPaths,
    codec: ArchiveCodec,
    backups: BackupManager,
}

impl RestoreManager {
    /// Create a new RestoreManager
    pub fn new(paths: VaultPaths, settings: &Settings) -> Self {
        Self {
            codec: ArchiveCodec::new(settings.compression_level, &settings.structured_extension),
            backups: BackupManager::new(paths.clone(), settings),
            paths,
        }
    }

    /// Restore live data from an archive, replacing it
    ///
    /// Never panics or returns early without a result: every failure after the
    /// safety backup still reports the safety archive's path.
    pub fn restore_from_file(&self, archive_path: &Path, now: DateTime<Local>) -> RestoreResult {
        let summary = match self.validate_backup(archive_path) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(archive = %archive_path.display(), error = %e, "restore rejected");
                return RestoreResult::failed(e, None);
            }
        };
        info!(
            archive = %archive_path.display(),
            entries = summary.entry_count,
            "archive validated"
        );

        let safety = match self.take_safety_backup(archive_path, now) {
            Ok(safety) => safety,
            Err(e) => {
                warn!(error = %e, "safety backup failed, restore aborted");
                return RestoreResult::failed(e, None);
            }
        };
        let safety_path = safety.path().map(Path::to_path_buf);

        let layout = match self.codec.detect_layout(archive_path) {
            Ok(layout) => layout,
            Err(e) => return RestoreResult::failed(e, safety_path),
        };
        info!(layout = %layout, "archive layout detected");

        match self.apply(archive_path, layout, &safety) {
            Ok(stats) => {
                info!(files = stats.files, bytes = stats.bytes, "restore complete");
                RestoreResult {
                    success: true,
                    safety_backup_path: safety_path,
                    layout: Some(layout),
                    files_restored: stats.files,
                    bytes_restored: stats.bytes,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "restore failed after clearing live data");
                RestoreResult {
                    layout: Some(layout),
                    ..RestoreResult::failed(e, safety_path)
                }
            }
        }
    }

    /// Validate a backup file without restoring it
    ///
    /// Checks the file exists, has a `.zip` extension, lives outside the data
    /// roots, and passes the codec's structural validation.
    pub fn validate_backup(&self, archive_path: &Path) -> VaultResult<ArchiveSummary> {
        if !archive_path.is_file() {
            return Err(VaultError::backup_not_found(archive_path.display().to_string()));
        }

        let is_zip = archive_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"));
        if !is_zip {
            return Err(VaultError::InvalidArchive(format!(
                "{} is not a .zip file",
                archive_path.display()
            )));
        }

        if self.paths.is_inside_data_root(archive_path) {
            return Err(VaultError::InvalidArchive(format!(
                "{} is inside a data root and would be deleted by the restore",
                archive_path.display()
            )));
        }

        self.codec.validate(archive_path)
    }

    /// Capture the live data into the manual backup directory
    ///
    /// Having no data at all is not an error here: there is nothing to lose.
    pub fn take_safety_backup(
        &self,
        archive_path: &Path,
        now: DateTime<Local>,
    ) -> VaultResult<SafetyBackup> {
        match self
            .backups
            .create_backup_protecting(None, now, archive_path)
        {
            Ok(info) => {
                info!(path = %info.path.display(), "safety backup created");
                Ok(SafetyBackup {
                    archive: Some(info),
                })
            }
            Err(VaultError::NoData(reason)) => {
                warn!(%reason, "no live data, restoring without a safety backup");
                Ok(SafetyBackup { archive: None })
            }
            Err(e) => Err(e),
        }
    }

    /// Clear the roots covered by `layout` and extract the archive into them
    pub fn apply(
        &self,
        archive_path: &Path,
        layout: LayoutVersion,
        _safety: &SafetyBackup,
    ) -> VaultResult<ExtractStats> {
        let targets: Vec<(RootId, Option<RootId>)> = match layout {
            LayoutVersion::Prefixed => RootId::ALL.iter().map(|r| (*r, Some(*r))).collect(),
            // Legacy archives only ever held the structured-data root
            LayoutVersion::Flat => vec![(RootId::Data, None)],
        };

        let mut touched: Vec<RootId> = Vec::new();
        let partial = |touched: &[RootId], e: &VaultError| {
            let roots: Vec<&str> = touched.iter().map(|r| r.prefix()).collect();
            VaultError::partial_state(roots.join(", "), e)
        };

        for (root, _) in &targets {
            touched.push(*root);
            let dir = self.root_dir(*root);
            let removed = clear(&dir).map_err(|e| partial(&touched, &e))?;
            info!(root = %root, removed, "data root cleared");
        }

        let mut total = ExtractStats::default();
        for (root, filter) in &targets {
            let dir = self.root_dir(*root);
            let stats = self
                .codec
                .extract(archive_path, *filter, &dir)
                .map_err(|e| partial(&touched, &e))?;
            info!(root = %root, files = stats.files, "data root restored");
            total.files += stats.files;
            total.bytes += stats.bytes;
        }

        Ok(total)
    }

    fn root_dir(&self, root: RootId) -> PathBuf {
        match root {
            RootId::Data => self.paths.data_dir(),
            RootId::Photos => self.paths.photos_dir(),
        }
    }
}

/// Result of a restore operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreResult {
    /// Whether the live data now matches the archive
    pub success: bool,
    /// Safety archive taken before anything was cleared
    pub safety_backup_path: Option<PathBuf>,
    /// Layout the archive was restored with
    pub layout: Option<LayoutVersion>,
    /// Files written
    pub files_restored: usize,
    /// Bytes written
    pub bytes_restored: u64,
    /// Error that ended the restore
    pub error: Option<VaultError>,
}

impl RestoreResult {
    /// A failed restore, carrying the safety archive if one was taken
    pub fn failed(error: VaultError, safety_backup_path: Option<PathBuf>) -> Self {
        Self {
            success: false,
            safety_backup_path,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Human-readable error message, if the restore failed
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    /// Whether a data root may be incomplete after this restore
    pub fn left_partial_state(&self) -> bool {
        self.error.as_ref().map_or(false, VaultError::is_partial_state)
    }

    /// Get a summary of the outcome
    pub fn summary(&self) -> String {
        let mut summary = if self.success {
            format!(
                "Restored {} file(s) from a {} archive",
                self.files_restored,
                self.layout.map(|l| l.to_string()).unwrap_or_default()
            )
        } else {
            format!(
                "Restore failed: {}",
                self.error_message().unwrap_or_else(|| "unknown error".into())
            )
        };

        if let Some(path) = &self.safety_backup_path {
            summary.push_str(&format!("\nSafety backup: {}", path.display()));
        }
        summary
    }
}
