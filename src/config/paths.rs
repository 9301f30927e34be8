//! Path management for DocVault
//!
//! Resolves the application data directory and everything derived from it.
//!
//! ## Path Resolution Order
//!
//! 1. `DOCVAULT_DATA_DIR` environment variable (if set)
//! 2. The user's documents directory joined with `DocVault`
//! 3. The platform data directory joined with `DocVault`

use std::path::{Path, PathBuf};

use directories::{BaseDirs, UserDirs};

use crate::error::VaultError;

/// Environment variable overriding the application data directory
pub const DATA_DIR_ENV: &str = "DOCVAULT_DATA_DIR";

const APP_DIR_NAME: &str = "DocVault";

/// Manages all paths used by DocVault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    /// Application data directory holding both data roots and the backups
    base_dir: PathBuf,
}

impl VaultPaths {
    /// Create a new VaultPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home or documents directory can be determined.
    pub fn new() -> Result<Self, VaultError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create VaultPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the application data directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Structured-data root (`{AppDataDir}/Data`)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("Data")
    }

    /// Media root (`{AppDataDir}/Photos`)
    pub fn photos_dir(&self) -> PathBuf {
        self.base_dir.join("Photos")
    }

    /// Manual archive directory (`{AppDataDir}/Backups`)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("Backups")
    }

    /// Automatic archive directory (`{AppDataDir}/Backups/Auto`)
    pub fn auto_backup_dir(&self) -> PathBuf {
        self.backup_dir().join("Auto")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Whether `path` lives inside one of the two data roots
    pub fn is_inside_data_root(&self, path: &Path) -> bool {
        let normalized = normalize(path);
        [self.data_dir(), self.photos_dir()]
            .iter()
            .any(|root| path.starts_with(root) || normalized.starts_with(normalize(root)))
    }

    /// Ensure the base and manual backup directories exist
    ///
    /// The data roots are owned by other components and are never created here.
    pub fn ensure_directories(&self) -> Result<(), VaultError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| VaultError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| VaultError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }
}

/// Canonicalize when possible so symlinked temp dirs compare equal
fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve the default data directory path based on platform
fn resolve_default_path() -> Result<PathBuf, VaultError> {
    if let Some(documents) = UserDirs::new().and_then(|u| u.document_dir().map(Path::to_path_buf))
    {
        return Ok(documents.join(APP_DIR_NAME));
    }

    BaseDirs::new()
        .map(|b| b.data_dir().join(APP_DIR_NAME))
        .ok_or_else(|| VaultError::Config("Could not determine a home directory".into()))
}
