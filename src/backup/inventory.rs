//! Backup inventory and data sizing
//!
//! Archives are discovered purely from the filesystem: every file named
//! `Backup_{yyyyMMdd_HHmmss}.zip` in the manual or automatic backup directory
//! is a backup. There is no separate index to keep in sync.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Serialize;
use tracing::warn;

use super::snapshot::tree_size;
use crate::error::{VaultError, VaultResult};

const FILE_PREFIX: &str = "Backup_";
const FILE_EXTENSION: &str = ".zip";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_LEN: usize = 15;

/// Metadata about a backup archive on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// When the backup was created
    pub created_at: DateTime<Local>,
    /// Size in bytes
    pub size_bytes: u64,
    /// Whether this backup lives in the automatic directory
    pub is_auto: bool,
}

impl BackupInfo {
    /// Human-readable size
    pub fn size_formatted(&self) -> String {
        format_size(self.size_bytes)
    }

    /// "Automatic" or "Manual"
    pub fn type_label(&self) -> &'static str {
        if self.is_auto {
            "Automatic"
        } else {
            "Manual"
        }
    }
}

/// A directory searched for archives, tagged with its origin
#[derive(Debug, Clone)]
pub struct ArchiveDir {
    pub path: PathBuf,
    pub is_auto: bool,
}

/// Byte sizes of the two live data roots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataSize {
    /// Bytes under the structured-data root
    pub structured_bytes: u64,
    /// Bytes under the media root
    pub media_bytes: u64,
}

impl DataSize {
    /// Measure both roots; missing roots count as zero
    pub fn measure(structured_root: &Path, media_root: &Path) -> Self {
        Self {
            structured_bytes: tree_size(structured_root),
            media_bytes: tree_size(media_root),
        }
    }

    pub fn total(&self) -> u64 {
        self.structured_bytes + self.media_bytes
    }
}

/// Archive filename for a backup taken at `timestamp`
///
/// `suffix` disambiguates two archives taken within the same second.
pub fn archive_file_name(timestamp: DateTime<Local>, suffix: Option<u32>) -> String {
    let stamp = timestamp.format(TIMESTAMP_FORMAT);
    match suffix {
        Some(n) => format!("{}{}_{}{}", FILE_PREFIX, stamp, n, FILE_EXTENSION),
        None => format!("{}{}{}", FILE_PREFIX, stamp, FILE_EXTENSION),
    }
}

/// Whether `filename` follows the archive naming pattern
pub fn is_archive_name(filename: &str) -> bool {
    filename.starts_with(FILE_PREFIX)
        && filename.len() > FILE_EXTENSION.len()
        && filename
            .get(filename.len() - FILE_EXTENSION.len()..)
            .map_or(false, |ext| ext.eq_ignore_ascii_case(FILE_EXTENSION))
}

/// List archives in `dirs`, newest first
///
/// Missing directories contribute nothing.
pub fn list_archives(dirs: &[ArchiveDir]) -> VaultResult<Vec<BackupInfo>> {
    let mut backups = Vec::new();

    for dir in dirs {
        if !dir.path.is_dir() {
            continue;
        }

        for entry in fs::read_dir(&dir.path).map_err(|e| {
            VaultError::Io(format!(
                "Failed to read backup directory {}: {}",
                dir.path.display(),
                e
            ))
        })? {
            let entry = entry
                .map_err(|e| VaultError::Io(format!("Failed to read directory entry: {}", e)))?;

            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(info) = parse_backup_info(&path, dir.is_auto) {
                backups.push(info);
            }
        }
    }

    sort_newest_first(&mut backups);
    Ok(backups)
}

/// Sort by creation time, newest first; same-second archives order by name
pub fn sort_newest_first(backups: &mut [BackupInfo]) {
    backups.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.filename.cmp(&a.filename))
    });
}

/// Build backup info for an archive file, or None if it isn't one
pub fn parse_backup_info(path: &Path, is_auto: bool) -> Option<BackupInfo> {
    let filename = path.file_name()?.to_str()?.to_string();
    if !is_archive_name(&filename) {
        return None;
    }

    let metadata = fs::metadata(path).ok()?;
    let created_at = parse_backup_timestamp(&filename).or_else(|| {
        metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .map(DateTime::<Local>::from)
    })?;

    Some(BackupInfo {
        filename,
        path: path.to_path_buf(),
        created_at,
        size_bytes: metadata.len(),
        is_auto,
    })
}

/// Parse the timestamp embedded in `Backup_{yyyyMMdd_HHmmss}[_N].zip`
///
/// Local times that name two instants (the hour repeated when clocks go back)
/// or none yield `None`, so callers fall back to file metadata.
pub fn parse_backup_timestamp(filename: &str) -> Option<DateTime<Local>> {
    parse_backup_timestamp_in(filename, &Local)
}

fn parse_backup_timestamp_in<Tz: TimeZone>(filename: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let rest = filename.strip_prefix(FILE_PREFIX)?;
    let stamp = rest.get(..TIMESTAMP_LEN)?;

    let tail = &rest[TIMESTAMP_LEN..];
    let tail = tail.get(..tail.len().checked_sub(FILE_EXTENSION.len())?)?;
    if !tail.is_empty() {
        let counter = tail.strip_prefix('_')?;
        if counter.is_empty() || !counter.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    tz.from_local_datetime(&naive).single()
}

/// Delete a single archive; best effort, never fails the caller
pub fn delete_archive(path: &Path) -> bool {
    delete_archive_with(path, |path| fs::remove_file(path))
}

fn delete_archive_with<F>(path: &Path, remove: F) -> bool
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let is_zip = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"));
    if !is_zip || !path.is_file() {
        return false;
    }

    match remove(path) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to delete backup");
            false
        }
    }
}

/// Format a byte count with binary thresholds (B, KB, MB, GB)
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
