//! Custom error types for DocVault
//!
//! This module defines the error hierarchy for the backup subsystem using
//! thiserror for ergonomic error definitions. Variants carry owned strings so
//! that outcome objects can hold a copy of the error that ended an operation.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// The main error type for DocVault operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Neither data root exists, so there is nothing to back up
    #[error("No data to back up: {0}")]
    NoData(String),

    /// The archive is a readable container but fails structural validation
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    /// The file is not a readable archive container at all
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// A destructive phase failed after a data root was cleared, leaving it incomplete
    #[error("Data root '{root}' is in a partial state: {cause}")]
    PartialState { root: String, cause: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Another backup or restore is running against the same data set
    #[error("Operation in progress: {0}")]
    Busy(String),
}

impl VaultError {
    /// Create a "not found" error for backup archives
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Wrap an error raised after `root` was touched by a destructive phase
    pub fn partial_state(root: impl Into<String>, cause: &VaultError) -> Self {
        match cause {
            // Already classified; keep the innermost root
            Self::PartialState { .. } => cause.clone(),
            other => Self::PartialState {
                root: root.into(),
                cause: other.to_string(),
            },
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if a live data root may currently be incomplete
    pub fn is_partial_state(&self) -> bool {
        matches!(self, Self::PartialState { .. })
    }

    /// Check if this error is raised before any live data could have been modified
    pub fn is_non_destructive(&self) -> bool {
        !self.is_partial_state()
    }
}

/// Errors serialize as their display message
impl Serialize for VaultError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<walkdir::Error> for VaultError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<zip::result::ZipError> for VaultError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e.to_string()),
            other => Self::CorruptArchive(other.to_string()),
        }
    }
}

/// Result type alias for DocVault operations
pub type VaultResult<T> = Result<T, VaultError>;
