//! Property storage with a single restore point.

use crate::error::CoreResult;
use recordkit_value::{Document, FromValue, Value};

/// Ordered property map plus at most one snapshot.
///
/// The snapshot is taken by [`set_restore_point`](Self::set_restore_point)
/// and is never modified afterwards; it is consumed by
/// [`revert_to_restore_point`](Self::revert_to_restore_point) or discarded by
/// [`inject_data`](Self::inject_data).
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    data: Document,
    restore_point: Option<Document>,
}

impl PropertyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `name` as `T`.
    ///
    /// A missing property or a null reads as `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is of another kind.
    pub fn get<T: FromValue + Default>(&self, name: &str) -> CoreResult<T> {
        match self.data.get(name) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => Ok(T::from_value(value)?),
        }
    }

    /// Raw access to the stored value.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Stores `value` under `name`, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(name, value)
    }

    /// Removes `name`.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.data.remove(name)
    }

    /// Snapshots the current data, replacing any earlier snapshot.
    pub fn set_restore_point(&mut self) {
        self.restore_point = Some(self.data.clone());
    }

    /// Replaces the data with the snapshot and discards it.
    ///
    /// Returns false, leaving the data untouched, if there is no snapshot.
    pub fn revert_to_restore_point(&mut self) -> bool {
        match self.restore_point.take() {
            Some(snapshot) => {
                self.data = snapshot;
                true
            }
            None => false,
        }
    }

    /// Returns true if a snapshot is held.
    #[must_use]
    pub fn has_restore_point(&self) -> bool {
        self.restore_point.is_some()
    }

    /// Replaces all data and discards any snapshot.
    pub fn inject_data(&mut self, data: Document) {
        self.data = data;
        self.restore_point = None;
    }

    /// The live data.
    #[must_use]
    pub fn data(&self) -> &Document {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn missing_reads_as_default() {
        let store = PropertyStore::new();
        assert_eq!(store.get::<i64>("Age").unwrap(), 0);
        assert_eq!(store.get::<String>("Name").unwrap(), "");
        assert_eq!(store.get::<Option<String>>("Name").unwrap(), None);
    }

    #[test]
    fn null_reads_as_default() {
        let mut store = PropertyStore::new();
        store.set("Age", Value::Null);
        assert_eq!(store.get::<i64>("Age").unwrap(), 0);
    }

    #[test]
    fn wrong_kind_is_error() {
        let mut store = PropertyStore::new();
        store.set("Age", "old");
        assert!(store.get::<i64>("Age").is_err());
    }

    #[test]
    fn revert_restores_snapshot() {
        let mut store = PropertyStore::new();
        store.set("Name", "Bob");
        store.set_restore_point();
        store.set("Name", "Alice");
        store.set("Extra", 1);

        assert!(store.revert_to_restore_point());
        assert_eq!(store.get::<String>("Name").unwrap(), "Bob");
        assert!(store.value("Extra").is_none());
    }

    #[test]
    fn second_revert_is_noop() {
        let mut store = PropertyStore::new();
        store.set("Name", "Bob");
        store.set_restore_point();
        store.set("Name", "Alice");
        assert!(store.revert_to_restore_point());
        store.set("Name", "Carol");

        assert!(!store.revert_to_restore_point());
        assert_eq!(store.get::<String>("Name").unwrap(), "Carol");
    }

    #[test]
    fn restore_point_overwrites_previous() {
        let mut store = PropertyStore::new();
        store.set("n", 1);
        store.set_restore_point();
        store.set("n", 2);
        store.set_restore_point();
        store.set("n", 3);
        store.revert_to_restore_point();
        assert_eq!(store.get::<i64>("n").unwrap(), 2);
    }

    #[test]
    fn inject_discards_snapshot() {
        let mut store = PropertyStore::new();
        store.set("n", 1);
        store.set_restore_point();

        let fresh: Document = [("n", 9)].into_iter().collect();
        store.inject_data(fresh);

        assert!(!store.has_restore_point());
        assert!(!store.revert_to_restore_point());
        assert_eq!(store.get::<i64>("n").unwrap(), 9);
    }

    proptest! {
        #[test]
        fn revert_undoes_any_writes(
            initial in prop::collection::btree_map("[a-d]", any::<i64>(), 0..4),
            writes in prop::collection::vec(("[a-f]", any::<i64>()), 0..16),
        ) {
            let mut store = PropertyStore::new();
            for (k, v) in &initial {
                store.set(k.clone(), *v);
            }
            let before = store.data().clone();
            store.set_restore_point();
            for (k, v) in writes {
                store.set(k, v);
            }
            store.revert_to_restore_point();
            prop_assert_eq!(store.data(), &before);
        }
    }
}
