//! Application-facing backup service
//!
//! Wraps the orchestrators behind the operations the application layer calls.
//! Expected failures come back as result values; one operation guard keeps
//! backups and restores from interleaving against the same data set.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, TryLockError};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use super::inventory::{self, ArchiveDir, BackupInfo, DataSize};
use super::manager::{BackupManager, BackupResult};
use super::restore::{RestoreManager, RestoreResult};
use super::retention::{AutoBackupDecision, AutoBackupPolicy};
use crate::config::paths::VaultPaths;
use crate::config::settings::Settings;
use crate::error::{VaultError, VaultResult};

/// Backup and restore operations for one application instance
pub struct BackupService {
    paths: VaultPaths,
    backups: BackupManager,
    restorer: RestoreManager,
    policy: AutoBackupPolicy,
    guard: Mutex<()>,
}

impl BackupService {
    pub fn new(paths: VaultPaths, settings: &Settings) -> Self {
        Self {
            backups: BackupManager::new(paths.clone(), settings),
            restorer: RestoreManager::new(paths.clone(), settings),
            policy: AutoBackupPolicy::new(settings.retention),
            paths,
            guard: Mutex::new(()),
        }
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    /// Back up both data roots into `target_dir` (default: the manual backup directory)
    pub fn backup(&self, target_dir: Option<&Path>) -> BackupResult {
        self.backup_at(target_dir, Local::now())
    }

    /// [`backup`](Self::backup) with an explicit clock
    pub fn backup_at(&self, target_dir: Option<&Path>, now: DateTime<Local>) -> BackupResult {
        let _guard = match self.lock() {
            Ok(guard) => guard,
            Err(e) => return BackupResult::failed(e),
        };

        match self.backups.create_backup(target_dir, now) {
            Ok(info) => BackupResult::created(&info),
            Err(e) => {
                warn!(error = %e, "backup failed");
                BackupResult::failed(e)
            }
        }
    }

    /// Throttled automatic backup, pruning old automatic archives afterwards
    pub fn auto_backup(&self) -> BackupResult {
        self.auto_backup_at(Local::now())
    }

    /// [`auto_backup`](Self::auto_backup) with an explicit clock
    pub fn auto_backup_at(&self, now: DateTime<Local>) -> BackupResult {
        let _guard = match self.lock() {
            Ok(guard) => guard,
            Err(e) => return BackupResult::failed(e),
        };

        let auto_dir = self.paths.auto_backup_dir();

        match self.policy.check(&auto_dir, now) {
            Ok(AutoBackupDecision::Skip(latest)) => {
                info!(latest = %latest.path.display(), "auto-backup skipped, recent backup exists");
                return BackupResult::skipped(&latest);
            }
            Ok(AutoBackupDecision::Run) => {}
            Err(e) => return BackupResult::failed(e),
        }

        let info = match self.backups.create_backup(Some(&auto_dir), now) {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "auto-backup failed");
                return BackupResult::failed(e);
            }
        };

        match self.policy.prune(&auto_dir) {
            Ok(report) => {
                for path in &report.deleted {
                    info!(path = %path.display(), "pruned old auto-backup");
                }
                for (path, reason) in &report.failed {
                    warn!(path = %path.display(), %reason, "could not prune old auto-backup");
                }
            }
            Err(e) => warn!(error = %e, "auto-backup pruning failed"),
        }

        BackupResult::created(&info)
    }

    /// Replace live data with the contents of `archive_path`
    pub fn restore(&self, archive_path: &Path) -> RestoreResult {
        self.restore_at(archive_path, Local::now())
    }

    /// [`restore`](Self::restore) with an explicit clock
    pub fn restore_at(&self, archive_path: &Path, now: DateTime<Local>) -> RestoreResult {
        let _guard = match self.lock() {
            Ok(guard) => guard,
            Err(e) => return RestoreResult::failed(e, None),
        };

        self.restorer.restore_from_file(archive_path, now)
    }

    /// Validate an archive without touching live data
    pub fn inspect(&self, archive_path: &Path) -> VaultResult<crate::archive::ArchiveSummary> {
        self.restorer.validate_backup(archive_path)
    }

    /// List archives newest first
    ///
    /// Without `dir`, lists the manual and automatic backup directories.
    pub fn list_backups(&self, dir: Option<&Path>) -> VaultResult<Vec<BackupInfo>> {
        let dirs = match dir {
            Some(dir) => vec![ArchiveDir {
                path: dir.to_path_buf(),
                is_auto: dir == self.paths.auto_backup_dir()
                    || dir.file_name().map_or(false, |name| name == "Auto"),
            }],
            None => vec![
                ArchiveDir {
                    path: self.paths.backup_dir(),
                    is_auto: false,
                },
                ArchiveDir {
                    path: self.paths.auto_backup_dir(),
                    is_auto: true,
                },
            ],
        };

        inventory::list_archives(&dirs)
    }

    /// The most recent archive across both directories
    pub fn latest_backup(&self) -> VaultResult<Option<BackupInfo>> {
        Ok(self.list_backups(None)?.into_iter().next())
    }

    /// Delete one archive; false if it is missing, not a `.zip`, or undeletable
    pub fn delete_backup(&self, path: &Path) -> bool {
        inventory::delete_archive(path)
    }

    /// Total bytes under both data roots
    pub fn data_size(&self) -> u64 {
        self.data_size_details().total()
    }

    /// Bytes under each data root
    pub fn data_size_details(&self) -> DataSize {
        DataSize::measure(&self.paths.data_dir(), &self.paths.photos_dir())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, VaultError> {
        match self.guard.try_lock() {
            Ok(guard) => Ok(guard),
            // A panicked operation leaves nothing behind that the guard protects
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(VaultError::Busy(
                "another backup or restore is already running".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveCodec;
    use crate::backup::inventory::format_size;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use walkdir::WalkDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn create_service() -> (BackupService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let service = BackupService::new(paths, &Settings::default());
        (service, temp_dir)
    }

    fn time(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).earliest().unwrap()
    }

    fn write_file(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn populate(paths: &VaultPaths) {
        write_file(&paths.data_dir().join("documents.db"), b"records v1");
        write_file(
            &paths.data_dir().join("Attachments").join("2025").join("scan.pdf"),
            b"%PDF-1.7",
        );
        write_file(&paths.photos_dir().join("Album A").join("1.jpg"), &[0xFF, 0xD8, 0x00]);
        write_file(&paths.photos_dir().join("Album B").join("2.png"), b"png");
    }

    /// Relative path -> contents for every file under `root`
    fn tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        if !root.exists() {
            return BTreeMap::new();
        }
        WalkDir::new(root)
            .into_iter()
            .map(Result::unwrap)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                (
                    e.path().strip_prefix(root).unwrap().to_path_buf(),
                    fs::read(e.path()).unwrap(),
                )
            })
            .collect()
    }

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, contents) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_round_trip_restores_both_roots() {
        let (service, _temp) = create_service();
        let paths = service.paths().clone();
        populate(&paths);
        let data_before = tree(&paths.data_dir());
        let photos_before = tree(&paths.photos_dir());

        let backup = service.backup_at(None, time(9, 0));
        assert!(backup.success, "{}", backup.summary());

        // Diverge from the snapshot
        write_file(&paths.data_dir().join("documents.db"), b"records v2");
        write_file(&paths.data_dir().join("new.txt"), b"added later");
        fs::remove_dir_all(paths.photos_dir().join("Album A")).unwrap();

        let result = service.restore_at(backup.file_path.as_ref().unwrap(), time(9, 30));

        assert!(result.success, "{}", result.summary());
        assert_eq!(tree(&paths.data_dir()), data_before);
        assert_eq!(tree(&paths.photos_dir()), photos_before);
    }

    #[test]
    fn test_round_trip_within_same_second() {
        let (service, _temp) = create_service();
        let paths = service.paths().clone();
        populate(&paths);
        let data_before = tree(&paths.data_dir());

        let backup = service.backup_at(None, time(9, 0));
        write_file(&paths.data_dir().join("documents.db"), b"changed");

        let result = service.restore_at(backup.file_path.as_ref().unwrap(), time(9, 0));

        assert!(result.success, "{}", result.summary());
        assert_ne!(result.safety_backup_path, backup.file_path);
        assert_eq!(tree(&paths.data_dir()), data_before);
    }

    #[test]
    fn test_legacy_archive_restores_data_only() {
        let (service, temp) = create_service();
        let paths = service.paths().clone();
        populate(&paths);
        let photos_before = tree(&paths.photos_dir());

        let legacy = temp.path().join("old-backup.zip");
        write_zip(
            &legacy,
            &[
                ("documents.db", b"legacy records"),
                ("Attachments/memo.docx", b"docx"),
            ],
        );

        let result = service.restore_at(&legacy, time(10, 0));

        assert!(result.success, "{}", result.summary());
        assert_eq!(result.layout, Some(crate::archive::LayoutVersion::Flat));

        let mut expected = BTreeMap::new();
        expected.insert(PathBuf::from("documents.db"), b"legacy records".to_vec());
        expected.insert(
            Path::new("Attachments").join("memo.docx"),
            b"docx".to_vec(),
        );
        assert_eq!(tree(&paths.data_dir()), expected);
        assert_eq!(tree(&paths.photos_dir()), photos_before);
    }

    #[test]
    fn test_invalid_archives_leave_data_untouched() {
        let (service, temp) = create_service();
        let paths = service.paths().clone();
        populate(&paths);
        let data_before = tree(&paths.data_dir());
        let photos_before = tree(&paths.photos_dir());

        let corrupt = temp.path().join("corrupt.zip");
        fs::write(&corrupt, b"not a zip").unwrap();
        let no_data = temp.path().join("photos-only.zip");
        write_zip(&no_data, &[("Photos/x.jpg", b"x")]);

        for path in [temp.path().join("missing.zip"), corrupt, no_data] {
            let result = service.restore_at(&path, time(11, 0));
            assert!(!result.success);
            assert!(result.error.as_ref().unwrap().is_non_destructive());
            assert!(result.safety_backup_path.is_none());
        }

        assert_eq!(tree(&paths.data_dir()), data_before);
        assert_eq!(tree(&paths.photos_dir()), photos_before);
        assert!(service.list_backups(None).unwrap().is_empty());
    }

    #[test]
    fn test_safety_backup_captures_pre_restore_state() {
        let (service, temp) = create_service();
        let paths = service.paths().clone();
        populate(&paths);
        let data_before = tree(&paths.data_dir());
        let photos_before = tree(&paths.photos_dir());

        // Passes validation, fails during extraction
        let failing = temp.path().join("failing.zip");
        write_zip(
            &failing,
            &[("Data/documents.db", b"x"), ("Data/../../escape.txt", b"y")],
        );

        let result = service.restore_at(&failing, time(12, 0));
        assert!(!result.success);
        assert!(result.left_partial_state());

        let safety = result.safety_backup_path.expect("safety backup path");
        let codec = ArchiveCodec::default();
        let check = temp.path().join("check");
        codec
            .extract(&safety, Some(crate::archive::RootId::Data), &check.join("Data"))
            .unwrap();
        codec
            .extract(&safety, Some(crate::archive::RootId::Photos), &check.join("Photos"))
            .unwrap();

        assert_eq!(tree(&check.join("Data")), data_before);
        assert_eq!(tree(&check.join("Photos")), photos_before);

        // Recovering from the safety backup restores the original state
        let recovered = service.restore_at(&safety, time(12, 5));
        assert!(recovered.success, "{}", recovered.summary());
        assert_eq!(tree(&paths.data_dir()), data_before);
        assert_eq!(tree(&paths.photos_dir()), photos_before);
    }

    #[test]
    fn test_auto_backup_throttled_within_hour() {
        let (service, _temp) = create_service();
        populate(service.paths());

        let first = service.auto_backup_at(time(8, 0));
        let second = service.auto_backup_at(time(8, 30));

        assert!(first.success && !first.skipped);
        assert!(second.success && second.skipped);
        assert_eq!(second.file_path, first.file_path);

        let archives = service
            .list_backups(Some(&service.paths().auto_backup_dir()))
            .unwrap();
        assert_eq!(archives.len(), 1);
        assert!(archives[0].is_auto);
    }

    #[test]
    fn test_auto_backup_with_real_clock() {
        let (service, _temp) = create_service();
        populate(service.paths());

        let first = service.auto_backup();
        let second = service.auto_backup();

        assert!(first.success && !first.skipped, "{}", first.summary());
        assert!(second.skipped);
        assert_eq!(service.list_backups(None).unwrap().len(), 1);
    }

    #[test]
    fn test_retention_keeps_ten_newest() {
        let (service, _temp) = create_service();
        populate(service.paths());

        let mut produced = Vec::new();
        for i in 0..12 {
            let now = time(0, 0) + chrono::Duration::hours(2 * i);
            let result = service.auto_backup_at(now);
            assert!(result.success && !result.skipped);
            produced.push(result.file_path.unwrap());
        }

        let remaining: Vec<PathBuf> = service
            .list_backups(Some(&service.paths().auto_backup_dir()))
            .unwrap()
            .into_iter()
            .map(|b| b.path)
            .collect();

        assert_eq!(remaining.len(), 10);
        let mut newest: Vec<PathBuf> = produced[2..].to_vec();
        newest.reverse();
        assert_eq!(remaining, newest);
    }

    #[test]
    fn test_manual_backups_are_never_pruned() {
        let (service, _temp) = create_service();
        populate(service.paths());

        for i in 0..12 {
            let result = service.backup_at(None, time(0, 0) + chrono::Duration::minutes(i));
            assert!(result.success);
        }
        service.auto_backup_at(time(23, 0));

        assert_eq!(
            service.list_backups(Some(&service.paths().backup_dir())).unwrap().len(),
            12
        );
        assert_eq!(service.list_backups(None).unwrap().len(), 13);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_survives_round_trip() {
        let (service, temp) = create_service();
        let paths = service.paths().clone();
        write_file(&paths.data_dir().join("documents.db"), b"records");
        fs::write(temp.path().join("outside.txt"), b"shared notes").unwrap();
        std::os::unix::fs::symlink("../outside.txt", paths.data_dir().join("link.txt")).unwrap();

        let backup = service.backup_at(None, time(9, 0));
        assert!(backup.success, "{}", backup.summary());

        let result = service.restore_at(backup.file_path.as_ref().unwrap(), time(9, 30));

        assert!(result.success, "{}", result.summary());
        assert_eq!(result.files_restored, 2);
        assert_eq!(
            fs::read(paths.data_dir().join("link.txt")).unwrap(),
            b"shared notes"
        );
        assert_eq!(
            fs::read(temp.path().join("outside.txt")).unwrap(),
            b"shared notes"
        );
    }

    #[test]
    fn test_backup_without_media_root() {
        let (service, _temp) = create_service();
        write_file(&service.paths().data_dir().join("documents.db"), b"records");

        let result = service.backup_at(None, time(9, 0));

        assert!(result.success);
        let summary = ArchiveCodec::default()
            .validate(result.file_path.as_ref().unwrap())
            .unwrap();
        assert_eq!(summary.entry_count, summary.data_entries);
        assert_eq!(summary.photo_entries, 0);
    }

    #[test]
    fn test_backup_without_any_data_fails() {
        let (service, _temp) = create_service();

        let result = service.backup_at(None, time(9, 0));

        assert!(!result.success);
        assert!(matches!(result.error, Some(VaultError::NoData(_))));
        assert!(result.error_message().is_some());
    }

    #[test]
    fn test_operations_are_serialized() {
        let (service, _temp) = create_service();
        populate(service.paths());

        let held = service.guard.lock().unwrap();
        let backup = service.backup_at(None, time(9, 0));
        let restore = service.restore_at(Path::new("whatever.zip"), time(9, 0));
        drop(held);

        assert!(matches!(backup.error, Some(VaultError::Busy(_))));
        assert!(matches!(restore.error, Some(VaultError::Busy(_))));
        assert!(service.backup_at(None, time(9, 1)).success);
    }

    #[test]
    fn test_list_delete_and_sizes() {
        let (service, _temp) = create_service();
        let paths = service.paths().clone();
        populate(&paths);

        let details = service.data_size_details();
        assert_eq!(details.structured_bytes, 18);
        assert_eq!(details.media_bytes, 6);
        assert_eq!(service.data_size(), 24);
        assert_eq!(format_size(service.data_size()), "24 B");

        let older = service.backup_at(None, time(9, 0));
        let newer = service.auto_backup_at(time(10, 0));

        let listed = service.list_backups(None).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(Some(&listed[0].path), newer.file_path.as_ref());
        assert!(listed[0].is_auto);
        assert!(!listed[1].is_auto);
        assert_eq!(
            service.latest_backup().unwrap().map(|b| b.path),
            newer.file_path
        );

        assert!(service.delete_backup(older.file_path.as_ref().unwrap()));
        assert!(!service.delete_backup(older.file_path.as_ref().unwrap()));
        assert_eq!(service.list_backups(None).unwrap().len(), 1);
    }
}
