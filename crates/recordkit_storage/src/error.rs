//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No record is stored under the key.
    #[error("record not found: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// A record is already stored under the key.
    #[error("record already exists: {key}")]
    AlreadyExists {
        /// The occupied key.
        key: String,
    },

    /// The key contains characters the backend cannot store.
    #[error("invalid key: {key:?}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// Another process holds the storage directory lock.
    #[error("storage directory is locked by another process")]
    Locked,

    /// Stored bytes could not be interpreted.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// A persistence adapter rejected the operation.
    #[error("adapter error: {message}")]
    Adapter {
        /// Description of the failure.
        message: String,
    },
}

impl StorageError {
    /// Create a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an already exists error.
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    /// Create an invalid key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Create an adapter error.
    pub fn adapter(message: impl Into<String>) -> Self {
        Self::Adapter {
            message: message.into(),
        }
    }
}
