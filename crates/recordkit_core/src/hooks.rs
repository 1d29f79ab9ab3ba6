//! Persistence hooks.
//!
//! A [`PersistenceHooks`] implementation is the adapter between an object
//! and its backing store. The object hands each hook a copy of its data and
//! only applies the result when the hook succeeds, so a failing hook leaves
//! the object untouched.

use recordkit_storage::{StorageBackend, StorageError, StorageResult};
use recordkit_value::{Document, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Adapter invoked by `save`, `fetch` and `delete`.
pub trait PersistenceHooks: Send {
    /// Persists a record for the first time.
    ///
    /// May add properties to `data` (for example a generated key); they are
    /// copied back onto the object.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be created.
    fn create_data(&mut self, data: &mut Document) -> StorageResult<()>;

    /// Persists changes to an existing record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be updated.
    fn update_data(&mut self, data: &mut Document) -> StorageResult<()>;

    /// Loads the full property set for the record identified by `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be loaded.
    fn fetch_data(&mut self, data: &Document) -> StorageResult<Document>;

    /// Removes the record identified by `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be removed.
    fn delete_data(&mut self, data: &Document) -> StorageResult<()>;
}

/// Hooks that persist nothing.
///
/// `fetch_data` returns the current data unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl PersistenceHooks for NoopHooks {
    fn create_data(&mut self, _data: &mut Document) -> StorageResult<()> {
        Ok(())
    }

    fn update_data(&mut self, _data: &mut Document) -> StorageResult<()> {
        Ok(())
    }

    fn fetch_data(&mut self, data: &Document) -> StorageResult<Document> {
        Ok(data.clone())
    }

    fn delete_data(&mut self, _data: &Document) -> StorageResult<()> {
        Ok(())
    }
}

/// Hooks that store each record's encoded document in a [`StorageBackend`].
///
/// The record key is the value of `key_property`. On create, a missing key
/// is generated as a UUID v4 and written back onto the object.
#[derive(Debug)]
pub struct BackendHooks<B> {
    backend: Arc<B>,
    key_property: String,
}

impl<B> Clone for BackendHooks<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            key_property: self.key_property.clone(),
        }
    }
}

impl<B: StorageBackend> BackendHooks<B> {
    /// Creates hooks over a shared backend.
    pub fn new(backend: Arc<B>, key_property: impl Into<String>) -> Self {
        Self {
            backend,
            key_property: key_property.into(),
        }
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Name of the key property.
    #[must_use]
    pub fn key_property(&self) -> &str {
        &self.key_property
    }

    fn key_of(&self, data: &Document) -> StorageResult<String> {
        match data.get(&self.key_property) {
            Some(Value::Text(key)) => Ok(key.clone()),
            Some(Value::Integer(n)) => Ok(n.to_string()),
            Some(Value::Null) | None => Err(StorageError::adapter(format!(
                "record has no '{}' key",
                self.key_property
            ))),
            Some(other) => Err(StorageError::adapter(format!(
                "key property '{}' holds {}",
                self.key_property,
                other.kind()
            ))),
        }
    }
}

impl<B: StorageBackend> PersistenceHooks for BackendHooks<B> {
    fn create_data(&mut self, data: &mut Document) -> StorageResult<()> {
        let key = match data.get(&self.key_property) {
            None | Some(Value::Null) => {
                let key = Uuid::new_v4().to_string();
                data.insert(self.key_property.clone(), key.clone());
                key
            }
            Some(_) => self.key_of(data)?,
        };
        self.backend.insert(&key, &data.encode())?;
        tracing::debug!(%key, "record created");
        Ok(())
    }

    fn update_data(&mut self, data: &mut Document) -> StorageResult<()> {
        let key = self.key_of(data)?;
        self.backend.update(&key, &data.encode())?;
        tracing::debug!(%key, "record updated");
        Ok(())
    }

    fn fetch_data(&mut self, data: &Document) -> StorageResult<Document> {
        let key = self.key_of(data)?;
        let bytes = self.backend.read(&key)?;
        Document::decode(&bytes)
            .map_err(|e| StorageError::Corrupted(format!("record {key}: {e}")))
    }

    fn delete_data(&mut self, data: &Document) -> StorageResult<()> {
        let key = self.key_of(data)?;
        self.backend.remove(&key)?;
        tracing::debug!(%key, "record removed");
        Ok(())
    }
}
