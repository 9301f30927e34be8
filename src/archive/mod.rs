//! Archive container for DocVault backups
//!
//! A backup archive is a deflate-compressed zip file. Two layouts exist:
//!
//! - Prefixed (current): the structured-data root under `Data/` and the
//!   media root under `Photos/`
//! - Flat (legacy): unprefixed entries holding only the structured-data root
//!
//! The layout is resolved once per restore through [`ArchiveCodec::detect_layout`]
//! and carried as a [`LayoutVersion`] value from then on.

mod codec;
mod layout;

use std::path::PathBuf;

pub use codec::{ArchiveCodec, ArchiveSummary, ExtractStats};
pub use layout::{to_entry_path, to_safe_relative, LayoutVersion, RootId};

/// A file scheduled for inclusion in an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Root the file belongs to
    pub root: RootId,
    /// Path relative to the root, forward-slash separated
    pub relative_path: String,
    /// Absolute path of the file on disk
    pub source: PathBuf,
}

impl ArchiveEntry {
    /// Name of the entry inside the archive (`{prefix}/{relative_path}`)
    pub fn archive_name(&self) -> String {
        self.root.entry_name(&self.relative_path)
    }
}
