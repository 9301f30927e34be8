//! Archive codec
//!
//! Reads and writes backup archives as deflate-compressed zip containers.
//! Archives are written to a temporary sibling file and renamed into place,
//! so a failed write never leaves a half-built archive under the final name.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::layout::{to_safe_relative, LayoutVersion, RootId};
use super::ArchiveEntry;
use crate::error::{VaultError, VaultResult};

/// Structural facts about an archive gathered from its central directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Total number of entries
    pub entry_count: usize,
    /// Entries under `Data/`
    pub data_entries: usize,
    /// Entries under `Photos/`
    pub photo_entries: usize,
    /// Entries carrying the structured store's extension
    pub store_files: usize,
    /// Layout resolved from the entry names
    pub layout: LayoutVersion,
}

/// Counters reported after an extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Files written to the destination
    pub files: usize,
    /// Uncompressed bytes written
    pub bytes: u64,
}

/// Encodes and decodes backup archives
#[derive(Debug, Clone)]
pub struct ArchiveCodec {
    /// Deflate level, 0 means stored
    compression_level: u8,
    /// Extension of the structured store file, lowercase, without the dot
    structured_extension: String,
}

impl ArchiveCodec {
    /// Create a codec with the given deflate level and structured-store extension
    pub fn new(compression_level: u8, structured_extension: &str) -> Self {
        Self {
            compression_level: compression_level.min(9),
            structured_extension: structured_extension
                .trim_start_matches('.')
                .to_ascii_lowercase(),
        }
    }

    /// Write `entries` into a new archive at `target`, replacing any existing file
    ///
    /// Returns the size of the finished archive in bytes.
    pub fn write<I>(&self, target: &Path, entries: I) -> VaultResult<u64>
    where
        I: IntoIterator<Item = VaultResult<ArchiveEntry>>,
    {
        let temp_path = temp_path_for(target);

        if let Err(e) = self.write_to(&temp_path, entries) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, target).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            VaultError::Io(format!(
                "Failed to move archive into place at {}: {}",
                target.display(),
                e
            ))
        })?;

        let size = fs::metadata(target)?.len();
        Ok(size)
    }

    fn write_to<I>(&self, temp_path: &Path, entries: I) -> VaultResult<()>
    where
        I: IntoIterator<Item = VaultResult<ArchiveEntry>>,
    {
        let file = File::create(temp_path).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create archive {}: {}",
                temp_path.display(),
                e
            ))
        })?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let base_options = self.file_options();

        let mut count = 0usize;
        for entry in entries {
            let entry = entry?;
            let name = entry.archive_name();

            let mut source = File::open(&entry.source).map_err(|e| {
                VaultError::Io(format!("Failed to open {}: {}", entry.source.display(), e))
            })?;
            let len = source.metadata()?.len();
            let options = base_options.large_file(len >= u64::from(u32::MAX));

            zip.start_file(name.as_str(), options).map_err(|e| {
                VaultError::Io(format!("Failed to add entry {}: {}", name, e))
            })?;
            io::copy(&mut source, &mut zip).map_err(|e| {
                VaultError::Io(format!("Failed to compress {}: {}", entry.source.display(), e))
            })?;
            count += 1;
        }

        let writer = zip
            .finish()
            .map_err(|e| VaultError::Io(format!("Failed to finish archive: {}", e)))?;
        let file = writer
            .into_inner()
            .map_err(|e| VaultError::Io(format!("Failed to flush archive: {}", e)))?;
        file.sync_all()
            .map_err(|e| VaultError::Io(format!("Failed to sync archive: {}", e)))?;

        debug!(entries = count, path = %temp_path.display(), "archive written");
        Ok(())
    }

    fn file_options(&self) -> SimpleFileOptions {
        if self.compression_level == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(self.compression_level.into()))
        }
    }

    /// Resolve the archive's layout by scanning entry names only
    pub fn detect_layout(&self, archive_path: &Path) -> VaultResult<LayoutVersion> {
        let archive = open_archive(archive_path)?;
        Ok(LayoutVersion::from_names(archive.file_names()))
    }

    /// Check that the archive is a readable container holding structured data
    ///
    /// A restorable archive has at least one `Data/` entry, or at least one
    /// entry carrying the structured store's extension (legacy archives).
    pub fn validate(&self, archive_path: &Path) -> VaultResult<ArchiveSummary> {
        let archive = open_archive(archive_path)?;
        let summary = self.summarize(archive.file_names());

        if summary.data_entries == 0 && summary.store_files == 0 {
            return Err(VaultError::InvalidArchive(format!(
                "{} contains no Data/ entries and no .{} file",
                archive_path.display(),
                self.structured_extension
            )));
        }

        Ok(summary)
    }

    fn summarize<'a>(&self, names: impl Iterator<Item = &'a str>) -> ArchiveSummary {
        let names: Vec<&str> = names.collect();
        let suffix = format!(".{}", self.structured_extension);

        ArchiveSummary {
            entry_count: names.len(),
            data_entries: names.iter().filter(|n| RootId::Data.matches(n)).count(),
            photo_entries: names.iter().filter(|n| RootId::Photos.matches(n)).count(),
            store_files: names
                .iter()
                .filter(|n| n.to_ascii_lowercase().ends_with(&suffix))
                .count(),
            layout: LayoutVersion::from_names(names.iter().copied()),
        }
    }

    /// Extract entries into `destination`, overwriting existing files
    ///
    /// With `filter` set, only entries under that root's prefix are extracted
    /// and the prefix is stripped. Without it every entry is extracted as-is.
    pub fn extract(
        &self,
        archive_path: &Path,
        filter: Option<RootId>,
        destination: &Path,
    ) -> VaultResult<ExtractStats> {
        let mut archive = open_archive(archive_path)?;

        // Directories are created on demand, so a root with no entries stays absent
        let mut stats = ExtractStats::default();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();

            let relative = match filter {
                Some(root) => match root.strip(&name) {
                    Some(rest) => rest,
                    None => continue,
                },
                None => name.as_str(),
            };
            // The prefix directory entry itself
            if relative.trim_matches('/').is_empty() {
                continue;
            }

            let relative_path = match (entry.enclosed_name(), to_safe_relative(relative)) {
                (Some(_), Some(path)) => path,
                _ => {
                    return Err(VaultError::InvalidArchive(format!(
                        "entry '{}' escapes the destination directory",
                        name
                    )))
                }
            };
            let out_path = destination.join(relative_path);

            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path).map_err(|e| {
                VaultError::Io(format!("Failed to create {}: {}", out_path.display(), e))
            })?;
            stats.bytes += io::copy(&mut entry, &mut out).map_err(|e| {
                VaultError::Io(format!("Failed to extract '{}': {}", name, e))
            })?;
            stats.files += 1;
        }

        if stats.files == 0 {
            warn!(archive = %archive_path.display(), filter = ?filter, "extraction wrote no files");
        }
        Ok(stats)
    }
}

impl Default for ArchiveCodec {
    fn default() -> Self {
        Self::new(9, "db")
    }
}

/// Open an archive for reading, classifying unreadable containers as corrupt
fn open_archive(archive_path: &Path) -> VaultResult<ZipArchive<BufReader<File>>> {
    let file = File::open(archive_path).map_err(|e| {
        VaultError::Io(format!(
            "Failed to open archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    ZipArchive::new(BufReader::new(file)).map_err(|e| {
        VaultError::CorruptArchive(format!("{}: {}", archive_path.display(), e))
    })
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
