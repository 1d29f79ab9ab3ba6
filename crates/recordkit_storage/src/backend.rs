//! Storage backend trait definition.

use crate::error::{StorageError, StorageResult};

/// A keyed storage backend for recordkit.
///
/// Storage backends are **opaque byte stores**. They map a key to the bytes
/// last written under it. recordkit owns the document encoding - backends do
/// not understand properties or records.
///
/// # Invariants
///
/// - `insert` fails with [`StorageError::AlreadyExists`] rather than overwrite
/// - `update`, `read` and `remove` fail with [`StorageError::NotFound`] for
///   absent keys
/// - `read` returns exactly the bytes last written under the key
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Stores `data` under a key that must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key is already present
    /// - The key is not valid for this backend
    /// - An I/O error occurs
    fn insert(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Replaces the bytes stored under an existing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is absent or an I/O error occurs.
    fn update(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Reads the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is absent or an I/O error occurs.
    fn read(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Removes the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is absent or an I/O error occurs.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Returns true if a record is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    fn contains(&self, key: &str) -> StorageResult<bool>;

    /// Returns every stored key in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the keys cannot be listed.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// Checks that `key` is non-empty and only uses `[A-Za-z0-9_-]`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] otherwise.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::invalid_key(key))
    }
}
