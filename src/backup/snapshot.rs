//! Tree snapshot and restore engine
//!
//! Walks a data root to produce archive entries, and clears a root before an
//! archive is extracted into it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::archive::{to_entry_path, ArchiveEntry, RootId};
use crate::error::{VaultError, VaultResult};

/// Lazy walk over every regular file under a data root
///
/// Yields one [`ArchiveEntry`] per file. Symlinks to files are stored with
/// the target's contents; anything else that is not a file or directory is
/// skipped with a warning. A missing root yields nothing.
/// Walk errors are yielded as items so the archive writer can abort on them.
pub struct Snapshot {
    root: RootId,
    base: PathBuf,
    walker: Option<walkdir::IntoIter>,
}

impl Iterator for Snapshot {
    type Item = VaultResult<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let walker = self.walker.as_mut()?;

        loop {
            let entry = match walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };

            if !is_archivable(&entry) {
                continue;
            }

            let Some(relative) = entry.path().strip_prefix(&self.base).ok() else {
                continue;
            };
            if relative.to_str().is_none() {
                warn!(
                    path = %entry.path().display(),
                    "file name is not valid UTF-8, storing it with replacement characters"
                );
            }

            return Some(match to_entry_path(relative) {
                Some(relative_path) => Ok(ArchiveEntry {
                    root: self.root,
                    relative_path,
                    source: entry.into_path(),
                }),
                None => Err(VaultError::Io(format!(
                    "Cannot store {} in an archive",
                    entry.path().display()
                ))),
            });
        }
    }
}

/// Whether a walked entry holds file contents to archive
///
/// Everything skipped here is lost by a restore, so it is logged.
fn is_archivable(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    if file_type.is_dir() {
        return false;
    }

    if file_type.is_symlink() {
        match fs::metadata(entry.path()) {
            Ok(target) if target.is_file() => return true,
            Ok(_) => warn!(path = %entry.path().display(), "skipping symlink to a directory"),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping dangling symlink")
            }
        }
    } else {
        warn!(path = %entry.path().display(), "skipping special file");
    }
    false
}

/// Start a snapshot of `base` to be stored under `root`'s prefix
pub fn snapshot(base: &Path, root: RootId) -> Snapshot {
    let walker = if base.is_dir() {
        Some(
            WalkDir::new(base)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
        )
    } else {
        debug!(root = %root, path = %base.display(), "data root missing, nothing to snapshot");
        None
    };

    Snapshot {
        root,
        base: base.to_path_buf(),
        walker,
    }
}

/// Delete everything inside `root`, keeping `root` itself
///
/// Returns the number of top-level items removed. A missing root is a no-op.
pub fn clear(root: &Path) -> VaultResult<usize> {
    if !root.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(root)
        .map_err(|e| VaultError::Io(format!("Failed to read {}: {}", root.display(), e)))?
    {
        let entry = entry
            .map_err(|e| VaultError::Io(format!("Failed to read directory entry: {}", e)))?;
        let path = entry.path();

        let result = if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| VaultError::Io(format!("Failed to remove {}: {}", path.display(), e)))?;
        removed += 1;
    }

    Ok(removed)
}

/// Total size in bytes of every file a snapshot of `root` would store
///
/// Missing roots are zero. Unreadable entries are logged and skipped.
pub fn tree_size(root: &Path) -> u64 {
    if !root.is_dir() {
        return 0;
    }

    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|result| match result {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry while sizing");
                None
            }
        })
        .filter(is_archivable)
        .filter_map(|entry| fs::metadata(entry.path()).ok())
        .map(|metadata| metadata.len())
        .sum()
}
