//! In-memory storage backend for testing.

use crate::backend::{validate_key, StorageBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory storage backend.
///
/// This backend stores all records in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral records that don't need persistence
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use recordkit_storage::{StorageBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.insert("k1", b"test data").unwrap();
/// assert!(backend.contains("k1").unwrap());
/// assert_eq!(backend.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl StorageBackend for InMemoryBackend {
    fn insert(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let mut records = self.records.write();
        if records.contains_key(key) {
            return Err(StorageError::already_exists(key));
        }
        records.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn update(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let mut records = self.records.write();
        match records.get_mut(key) {
            Some(slot) => {
                *slot = data.to_vec();
                Ok(())
            }
            None => Err(StorageError::not_found(key)),
        }
    }

    fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.records
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.records
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(key))
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.records.read().contains_key(key))
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.records.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn memory_new_is_empty() {
        let backend = InMemoryBackend::new();
        assert!(backend.is_empty());
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn memory_insert_then_read() {
        let backend = InMemoryBackend::new();
        backend.insert("a", b"hello").unwrap();
        assert_eq!(backend.read("a").unwrap(), b"hello");
    }

    #[test]
    fn memory_insert_existing_fails() {
        let backend = InMemoryBackend::new();
        backend.insert("a", b"one").unwrap();
        let result = backend.insert("a", b"two");
        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));
        assert_eq!(backend.read("a").unwrap(), b"one");
    }

    #[test]
    fn memory_update_missing_fails() {
        let backend = InMemoryBackend::new();
        let result = backend.update("a", b"x");
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn memory_update_replaces() {
        let backend = InMemoryBackend::new();
        backend.insert("a", b"one").unwrap();
        backend.update("a", b"two").unwrap();
        assert_eq!(backend.read("a").unwrap(), b"two");
    }

    #[test]
    fn memory_remove() {
        let backend = InMemoryBackend::new();
        backend.insert("a", b"one").unwrap();
        backend.remove("a").unwrap();
        assert!(!backend.contains("a").unwrap());
        assert!(matches!(
            backend.remove("a"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn memory_keys_sorted() {
        let backend = InMemoryBackend::new();
        backend.insert("c", b"").unwrap();
        backend.insert("a", b"").unwrap();
        backend.insert("b", b"").unwrap();
        assert_eq!(backend.keys().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn memory_rejects_invalid_key() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.insert("a/b", b""),
            Err(StorageError::InvalidKey { .. })
        ));
    }

    #[test]
    fn memory_clear() {
        let backend = InMemoryBackend::new();
        backend.insert("a", b"x").unwrap();
        backend.clear();
        assert!(backend.is_empty());
    }

    proptest! {
        #[test]
        fn memory_last_write_wins(
            key in "[a-z]{1,8}",
            writes in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 1..8),
        ) {
            let backend = InMemoryBackend::new();
            backend.insert(&key, &writes[0]).unwrap();
            for data in &writes[1..] {
                backend.update(&key, data).unwrap();
            }
            prop_assert_eq!(backend.read(&key).unwrap(), writes.last().unwrap().clone());
        }
    }
}
