//! User settings for DocVault
//!
//! Manages backup preferences: the retention window for automatic archives,
//! the deflate level used when writing archives, and the file extension that
//! identifies the structured store inside legacy archives.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::error::VaultError;

/// Minimum time between two automatic backups
pub const MIN_AUTO_BACKUP_INTERVAL_MINUTES: u64 = 60;

/// Number of automatic archives kept after pruning
pub const MAX_AUTO_BACKUPS: usize = 10;

/// Retention policy for automatic backups
///
/// Applies only to the automatic archive directory; manual archives are never pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionWindow {
    /// Minimum minutes between automatic backups
    pub min_interval_minutes: u64,
    /// Number of automatic backups to keep
    pub max_auto_backups: usize,
}

impl RetentionWindow {
    /// Minimum interval as a std duration
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_minutes.saturating_mul(60))
    }
}

impl Default for RetentionWindow {
    fn default() -> Self {
        Self {
            min_interval_minutes: MIN_AUTO_BACKUP_INTERVAL_MINUTES,
            max_auto_backups: MAX_AUTO_BACKUPS,
        }
    }
}

/// User settings for DocVault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Automatic backup retention policy
    #[serde(default)]
    pub retention: RetentionWindow,

    /// Deflate level (0-9) used for archive entries
    #[serde(default = "default_compression_level")]
    pub compression_level: u8,

    /// Extension of the structured store file, without the dot
    #[serde(default = "default_structured_extension")]
    pub structured_extension: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_compression_level() -> u8 {
    9
}

fn default_structured_extension() -> String {
    "db".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            retention: RetentionWindow::default(),
            compression_level: default_compression_level(),
            structured_extension: default_structured_extension(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &VaultPaths) -> Result<Self, VaultError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| VaultError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                VaultError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &VaultPaths) -> Result<(), VaultError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| VaultError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| VaultError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    fn validate(&self) -> Result<(), VaultError> {
        if self.compression_level > 9 {
            return Err(VaultError::Config(format!(
                "compression_level must be between 0 and 9, got {}",
                self.compression_level
            )));
        }
        if self.retention.max_auto_backups == 0 {
            return Err(VaultError::Config(
                "retention.max_auto_backups must be at least 1".into(),
            ));
        }
        if self.structured_extension.trim_start_matches('.').is_empty() {
            return Err(VaultError::Config(
                "structured_extension must not be empty".into(),
            ));
        }
        Ok(())
    }
}
