//! CLI command handlers
//!
//! Bridges the clap argument parsing with the backup service.

pub mod backup;

pub use backup::{handle_backup_command, resolve_backup_path, BackupCommands};
