//! Configuration module for DocVault
//!
//! This module provides configuration management including:
//! - Application data directory resolution
//! - Backup settings persistence

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{RetentionWindow, Settings};
