//! Archive entry naming
//!
//! Current archives hold each data root under its own top-level prefix.
//! Archives written by older releases have no prefix at all and contain only
//! the structured-data root.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One of the two data roots captured in an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootId {
    /// Structured-data root (record store)
    Data,
    /// Media root (photo tree)
    Photos,
}

impl RootId {
    /// Both roots, in the order they are written and restored
    pub const ALL: [RootId; 2] = [RootId::Data, RootId::Photos];

    /// Top-level directory name used inside prefixed archives
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Data => "Data",
            Self::Photos => "Photos",
        }
    }

    /// Archive name for a file at `relative_path` under this root
    pub fn entry_name(&self, relative_path: &str) -> String {
        format!("{}/{}", self.prefix(), relative_path)
    }

    /// Whether `name` lives under this root's prefix (ASCII case-insensitive)
    pub fn matches(&self, name: &str) -> bool {
        self.strip(name).is_some()
    }

    /// Strip `{prefix}/` from `name`, returning the root-relative remainder
    pub fn strip<'a>(&self, name: &'a str) -> Option<&'a str> {
        let prefix = self.prefix();
        let head = name.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        name[prefix.len()..].strip_prefix('/')
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Entry-naming convention of an archive, resolved once per restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutVersion {
    /// Legacy: unprefixed entries, all belonging to the structured-data root
    Flat,
    /// Current: entries under `Data/` and `Photos/`
    Prefixed,
}

impl LayoutVersion {
    /// Resolve the layout from a set of entry names
    ///
    /// Any prefixed entry makes the archive `Prefixed`; stray unprefixed entries
    /// in such an archive are ignored on restore.
    pub fn from_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let prefixed = names
            .into_iter()
            .any(|name| RootId::ALL.iter().any(|root| root.matches(name)));

        if prefixed {
            Self::Prefixed
        } else {
            Self::Flat
        }
    }
}

impl fmt::Display for LayoutVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat (legacy)"),
            Self::Prefixed => f.write_str("prefixed"),
        }
    }
}

/// Convert a relative path into a forward-slash archive name
pub fn to_entry_path(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Convert an archive name into a relative path that cannot escape its destination
pub fn to_safe_relative(name: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for part in name.split(['/', '\\']).filter(|p| !p.is_empty()) {
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(normal)), None) => path.push(normal),
            _ => return None,
        }
    }
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}
