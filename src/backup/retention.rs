//! Retention policy for automatic backups
//!
//! Automatic backups are throttled to one per rolling window and capped in
//! number. The time of the last automatic backup is read from the archives on
//! disk every time, so the policy survives process restarts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::inventory::{list_archives, ArchiveDir, BackupInfo};
use crate::config::settings::RetentionWindow;
use crate::error::VaultResult;

/// Outcome of the pre-backup throttle check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoBackupDecision {
    /// No recent automatic backup; take one
    Run,
    /// A backup inside the window already exists
    Skip(BackupInfo),
}

/// Files removed (or not) by a prune pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Archives deleted
    pub deleted: Vec<PathBuf>,
    /// Archives that could not be deleted, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Throttle and pruning hooks wrapped around an automatic backup
#[derive(Debug, Clone, Copy)]
pub struct AutoBackupPolicy {
    window: RetentionWindow,
}

impl AutoBackupPolicy {
    pub fn new(window: RetentionWindow) -> Self {
        Self { window }
    }

    /// Decide whether an automatic backup should run at `now`
    ///
    /// Runs when the directory holds no archives or the newest one is older
    /// than the minimum interval. A newest archive dated in the future (clock
    /// moved backwards) does not block new backups.
    pub fn check(&self, auto_dir: &Path, now: DateTime<Local>) -> VaultResult<AutoBackupDecision> {
        let newest = list_auto(auto_dir)?.into_iter().next();

        let Some(latest) = newest else {
            return Ok(AutoBackupDecision::Run);
        };

        let age = now.signed_duration_since(latest.created_at);
        // An interval too large for chrono never expires
        let expired = chrono::Duration::from_std(self.window.min_interval())
            .map_or(false, |min_interval| age > min_interval);

        if age < chrono::Duration::zero() || expired {
            Ok(AutoBackupDecision::Run)
        } else {
            Ok(AutoBackupDecision::Skip(latest))
        }
    }

    /// Delete every automatic archive beyond the newest `max_auto_backups`
    ///
    /// Individual deletion failures are collected, never raised.
    pub fn prune(&self, auto_dir: &Path) -> VaultResult<PruneReport> {
        self.prune_with(auto_dir, |path| fs::remove_file(path))
    }

    fn prune_with<F>(&self, auto_dir: &Path, mut remove: F) -> VaultResult<PruneReport>
    where
        F: FnMut(&Path) -> io::Result<()>,
    {
        let mut report = PruneReport::default();

        for backup in list_auto(auto_dir)?
            .into_iter()
            .skip(self.window.max_auto_backups)
        {
            match remove(&backup.path) {
                Ok(()) => report.deleted.push(backup.path),
                Err(e) => report.failed.push((backup.path, e.to_string())),
            }
        }

        Ok(report)
    }
}

impl Default for AutoBackupPolicy {
    fn default() -> Self {
        Self::new(RetentionWindow::default())
    }
}

fn list_auto(auto_dir: &Path) -> VaultResult<Vec<BackupInfo>> {
    list_archives(&[ArchiveDir {
        path: auto_dir.to_path_buf(),
        is_auto: true,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::inventory::archive_file_name;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn base_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).earliest().unwrap()
    }

    fn touch(dir: &Path, at: DateTime<Local>) -> PathBuf {
        let path = dir.join(archive_file_name(at, None));
        fs::write(&path, b"zip").unwrap();
        path
    }

    #[test]
    fn test_empty_dir_runs() {
        let temp = TempDir::new().unwrap();
        let policy = AutoBackupPolicy::default();

        assert_eq!(
            policy.check(temp.path(), base_time()).unwrap(),
            AutoBackupDecision::Run
        );
        assert_eq!(
            policy.check(&temp.path().join("missing"), base_time()).unwrap(),
            AutoBackupDecision::Run
        );
    }

    #[test]
    fn test_recent_backup_skips() {
        let temp = TempDir::new().unwrap();
        let path = touch(temp.path(), base_time());
        let policy = AutoBackupPolicy::default();

        let decision = policy
            .check(temp.path(), base_time() + chrono::Duration::minutes(59))
            .unwrap();
        match decision {
            AutoBackupDecision::Skip(latest) => assert_eq!(latest.path, path),
            other => panic!("expected skip, got {:?}", other),
        }

        // Exactly one hour is still inside the window
        assert!(matches!(
            policy
                .check(temp.path(), base_time() + chrono::Duration::hours(1))
                .unwrap(),
            AutoBackupDecision::Skip(_)
        ));
    }

    #[test]
    fn test_old_backup_runs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), base_time());
        let policy = AutoBackupPolicy::default();

        let later = base_time() + chrono::Duration::minutes(61);
        assert_eq!(policy.check(temp.path(), later).unwrap(), AutoBackupDecision::Run);
    }

    #[test]
    fn test_future_backup_does_not_block() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), base_time() + chrono::Duration::days(1));
        let policy = AutoBackupPolicy::default();

        assert_eq!(
            policy.check(temp.path(), base_time()).unwrap(),
            AutoBackupDecision::Run
        );
    }

    #[test]
    fn test_prune_keeps_newest() {
        let temp = TempDir::new().unwrap();
        let policy = AutoBackupPolicy::new(RetentionWindow {
            min_interval_minutes: 60,
            max_auto_backups: 3,
        });

        let created: Vec<PathBuf> = (0..5)
            .map(|i| touch(temp.path(), base_time() + chrono::Duration::hours(2 * i)))
            .collect();

        let report = policy.prune(temp.path()).unwrap();

        assert_eq!(report.deleted.len(), 2);
        assert!(report.failed.is_empty());
        assert!(!created[0].exists());
        assert!(!created[1].exists());
        assert!(created[2..].iter().all(|p| p.exists()));
    }

    #[test]
    fn test_prune_under_limit_is_noop() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), base_time());

        let report = AutoBackupPolicy::default().prune(temp.path()).unwrap();
        assert!(report.deleted.is_empty());
    }

    #[test]
    fn test_prune_collects_failures() {
        let temp = TempDir::new().unwrap();
        let policy = AutoBackupPolicy::new(RetentionWindow {
            min_interval_minutes: 60,
            max_auto_backups: 1,
        });

        let created: Vec<PathBuf> = (0..3)
            .map(|i| touch(temp.path(), base_time() + chrono::Duration::hours(2 * i)))
            .collect();
        let locked = created[1].clone();

        let report = policy
            .prune_with(temp.path(), |path| {
                if path == locked {
                    Err(io::Error::new(io::ErrorKind::PermissionDenied, "file is locked"))
                } else {
                    fs::remove_file(path)
                }
            })
            .unwrap();

        assert_eq!(report.deleted, vec![created[0].clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, locked);
        assert!(report.failed[0].1.contains("file is locked"));
        assert!(locked.exists());
        assert!(created[2].exists());
    }
}
