//! Error types for settings-store

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for settings-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for settings-store
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Store Unavailable
    // -------------------------------------------------------------------------
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // -------------------------------------------------------------------------
    // Document / Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Settings file '{path}' is not a JSON object: {reason}")]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to render serialized blob: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Settings Errors
    // -------------------------------------------------------------------------
    #[error("Invalid setting key: {0}")]
    InvalidKey(String),

    #[error("Invalid setting value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Type mismatch for {key}: {reason}")]
    TypeMismatch { key: String, reason: String },

    // -------------------------------------------------------------------------
    // Encryption Errors
    // -------------------------------------------------------------------------
    #[error("Encryption error: {0}")]
    Encryption(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if the storage medium itself could not be reached
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        match self {
            Error::FileRead { .. } | Error::FileWrite { .. } | Error::DirectoryCreate { .. } => {
                true
            }
            #[cfg(feature = "database")]
            Error::Database(_) => true,
            _ => false,
        }
    }

    /// Check if this error was caused by invalid caller input
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidKey(_) | Error::InvalidValue { .. } | Error::TypeMismatch { .. }
        )
    }
}

// =============================================================================
// Filesystem Helper Functions
// =============================================================================

/// Read a file to string, mapping the I/O error to [`Error::FileRead`]
pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_unavailable_classification() {
        let err = Error::FileRead {
            path: PathBuf::from("/nope"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.is_store_unavailable());
        assert!(!err.is_invalid_input());

        let err = Error::MalformedDocument {
            path: PathBuf::from("settings.json"),
            reason: "expected object".into(),
        };
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn test_invalid_input_classification() {
        assert!(Error::InvalidKey(String::new()).is_invalid_input());
        assert!(Error::InvalidValue {
            key: "a".into(),
            reason: "null".into()
        }
        .is_invalid_input());
        assert!(!Error::Config("x".into()).is_invalid_input());
    }

    #[test]
    fn test_error_messages_name_the_path() {
        let err = Error::FileWrite {
            path: PathBuf::from("/tmp/settings.json"),
            source: std::io::Error::other("disk full"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/settings.json"));
        assert!(msg.contains("disk full"));
    }
}
