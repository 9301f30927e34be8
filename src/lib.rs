//! DocVault - archival backup and restore for a document store and photo library
//!
//! The application keeps two data roots under one application directory:
//! `Data/` (the structured store) and `Photos/` (media files). This library
//! snapshots both into a single zip archive, restores them from an archive
//! in either the current prefixed layout or the legacy flat layout, and
//! manages throttled automatic backups with bounded retention.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `archive`: Zip archive layout, writing, validation and extraction
//! - `backup`: Backup, restore, retention and inventory
//! - `cli`: Command handlers for the `docvault` binary
//! - `display`: Terminal formatting
//! - `logging`: tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use docvault::backup::BackupService;
//! use docvault::config::{paths::VaultPaths, settings::Settings};
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let service = BackupService::new(paths, &settings);
//! ```

pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;

pub use error::{VaultError, VaultResult};
