//! Backup system for DocVault
//!
//! Snapshots the structured-data root and the media root into a single zip
//! archive, and restores live data from such an archive.
//!
//! # Architecture
//!
//! - `snapshot`: walks a data root into archive entries, clears a root before restore
//! - `BackupManager`: builds a timestamp-named archive of both roots
//! - `RestoreManager`: validates, takes a safety backup, detects the layout, applies
//! - `AutoBackupPolicy`: throttles automatic backups and prunes old ones
//! - `inventory`: lists archives and measures the data roots
//! - `BackupService`: the operations exposed to the application, behind one guard
//!
//! # Directory Layout
//!
//! - `{AppDataDir}/Data/**`: structured-data root
//! - `{AppDataDir}/Photos/**`: media root
//! - `{AppDataDir}/Backups/Backup_{yyyyMMdd_HHmmss}.zip`: manual archives
//! - `{AppDataDir}/Backups/Auto/Backup_{yyyyMMdd_HHmmss}.zip`: automatic archives
//!
//! # Retention Policy
//!
//! At most one automatic backup per hour; the newest 10 automatic archives
//! are kept. Manual archives are never pruned.
//!
//! # Example
//!
//! ```rust,ignore
//! use docvault::backup::BackupService;
//! use docvault::config::{VaultPaths, Settings};
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let service = BackupService::new(paths, &settings);
//!
//! let result = service.auto_backup();
//! println!("{}", result.summary());
//!
//! // Later, restore from a backup
//! let result = service.restore(&backup_path);
//! println!("{}", result.summary());
//! ```

pub mod inventory;
mod manager;
mod restore;
mod retention;
mod service;
pub mod snapshot;

pub use inventory::{format_size, BackupInfo, DataSize};
pub use manager::{BackupManager, BackupResult};
pub use restore::{RestoreManager, RestoreResult, SafetyBackup};
pub use retention::{AutoBackupDecision, AutoBackupPolicy, PruneReport};
pub use service::BackupService;
