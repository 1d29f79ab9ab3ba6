//! Per-transaction memento.

use crate::error::{CoreError, CoreResult};
use crate::state::ModificationState;
use crate::types::TransactionId;
use recordkit_value::Value;
use std::collections::BTreeMap;

/// Something a memento can be restored onto.
pub trait RestoreTarget {
    /// Returns false for properties restore must skip.
    fn is_writable(&self, property: &str) -> bool;

    /// Writes a backed-up value back without validation.
    ///
    /// `None` means the property was absent when it was backed up.
    ///
    /// # Errors
    ///
    /// Returns an error if the target refuses the write.
    fn restore_property(&mut self, property: &str, value: Option<Value>) -> CoreResult<()>;
}

/// Memento of one transaction on one object.
///
/// Holds the value each property had before its first write in the
/// transaction, the error messages raised while the transaction was open,
/// and the modification state to return to on rollback.
#[derive(Debug, Clone)]
pub struct TransactionData {
    id: TransactionId,
    backups: BTreeMap<String, Option<Value>>,
    errors: Vec<String>,
    failed: bool,
    rolling_back: bool,
    state_backup: ModificationState,
}

impl TransactionData {
    /// Creates an empty memento for `id`, remembering `state`.
    #[must_use]
    pub fn new(id: TransactionId, state: ModificationState) -> Self {
        Self {
            id,
            backups: BTreeMap::new(),
            errors: Vec::new(),
            failed: false,
            rolling_back: false,
            state_backup: state,
        }
    }

    /// The owning transaction.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Records `prior` for `property` unless it was already recorded.
    ///
    /// Returns true if this call stored the backup.
    pub fn backup_property(&mut self, property: &str, prior: Option<Value>) -> bool {
        if self.backups.contains_key(property) {
            return false;
        }
        self.backups.insert(property.to_string(), prior);
        true
    }

    /// Returns true if `property` has a backup.
    #[must_use]
    pub fn is_backed_up(&self, property: &str) -> bool {
        self.backups.contains_key(property)
    }

    /// Number of backed-up properties.
    #[must_use]
    pub fn backup_count(&self) -> usize {
        self.backups.len()
    }

    /// Writes every backup onto `target`, skipping properties it reports as
    /// not writable.
    ///
    /// # Errors
    ///
    /// Returns `UndoFailed` naming the first property the target rejected.
    pub fn restore(&self, target: &mut impl RestoreTarget) -> CoreResult<()> {
        for (property, value) in &self.backups {
            if !target.is_writable(property) {
                continue;
            }
            target
                .restore_property(property, value.clone())
                .map_err(|e| CoreError::undo_failed(property.as_str(), e))?;
        }
        Ok(())
    }

    /// Appends error messages.
    pub fn add_errors(&mut self, messages: impl IntoIterator<Item = String>) {
        self.errors.extend(messages);
    }

    /// Error messages recorded so far.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Marks the transaction as failed.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Returns true if a write failed during the transaction.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Sets the rolling-back flag.
    pub fn set_rolling_back(&mut self, value: bool) {
        self.rolling_back = value;
    }

    /// Returns true while a rollback is restoring values.
    #[must_use]
    pub fn is_rolling_back(&self) -> bool {
        self.rolling_back
    }

    /// State to return to on rollback.
    #[must_use]
    pub fn state_backup(&self) -> ModificationState {
        self.state_backup
    }

    /// Drops the backups and remembers `state` as the new rollback state.
    ///
    /// Errors and the failure flag are kept.
    pub fn rebase(&mut self, state: ModificationState) {
        self.backups.clear();
        self.state_backup = state;
    }

    /// Clears backups, errors and flags, and remembers `state` as the new
    /// rollback state.
    pub fn reset(&mut self, state: ModificationState) {
        self.rebase(state);
        self.errors.clear();
        self.failed = false;
        self.rolling_back = false;
    }
}
