//! Error types for tiercfg

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tiercfg operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tiercfg
///
/// An absent key is never an error: lookups return `Ok(None)`.
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Setting storage '{backend}' unavailable: {reason}")]
    StorageUnavailable { backend: String, reason: String },

    // -------------------------------------------------------------------------
    // Crypto Errors
    // -------------------------------------------------------------------------
    /// `key` names the setting when the failure is tied to a stored row
    #[error(
        "Failed to decrypt{}: key mismatch or corrupted value",
        key.as_ref().map(|k| format!(" setting '{k}'")).unwrap_or_default()
    )]
    DecryptionFailed { key: Option<String> },

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Failed to derive encryption key: {0}")]
    KeyDerivation(String),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    /// A caller-supplied validator refused `value`. The input is kept so the
    /// form layer can re-render it.
    #[error("Invalid value for {key}: {reason}")]
    ValidationRejected {
        key: String,
        value: String,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // I/O Errors (file tier)
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

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a `StorageUnavailable` error for the named backend
    pub fn storage(backend: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::StorageUnavailable {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if the repository could not be reached
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Error::StorageUnavailable { .. })
    }

    /// Check if a stored value could not be decrypted
    #[must_use]
    pub fn is_decryption_failed(&self) -> bool {
        matches!(self, Error::DecryptionFailed { .. })
    }

    /// Check if a validator rejected the input
    #[must_use]
    pub fn is_validation_rejected(&self) -> bool {
        matches!(self, Error::ValidationRejected { .. })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::storage("sqlite", err)
    }
}
