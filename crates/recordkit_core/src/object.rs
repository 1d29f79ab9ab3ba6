//! Persisted objects.
//!
//! [`PersistedObject`] binds a property store, a modification state machine,
//! a validator and a transaction memento behind one per-object mutex, and
//! dispatches `save`, `fetch` and `delete` to its [`PersistenceHooks`].
//!
//! # Locking
//!
//! Every operation takes the object mutex for a short, non-blocking critical
//! section. Only enlisting a transaction may block, and it does so on the
//! [`TransactionLock`] after the mutex has been released. Events are emitted
//! and transaction callbacks registered only once the mutex is released.
//!
//! ```text
//! object mutex ──► transaction lock state ──► waiter
//! ```

use crate::config::{ObjectConfig, ValidationMode};
use crate::error::{CoreError, CoreResult, PropertyViolation, ValidationFailure};
use crate::events::{EventFeed, EventKind, ObjectEvent};
use crate::hooks::PersistenceHooks;
use crate::property::PropertyStore;
use crate::state::{ModificationState, StateMachine};
use crate::transaction::{
    Admission, RestoreTarget, Transaction, TransactionData, TransactionLock, TransactionOutcome,
};
use crate::types::{ObjectId, TransactionId};
use crate::validation::{ValidationRule, Validator};
use parking_lot::Mutex;
use recordkit_value::{Document, FromValue, Value};
use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

struct ActiveTransaction {
    data: TransactionData,
    /// Thread that enlisted; a second begin from it is a double begin.
    owner: ThreadId,
}

struct ObjectInner<H> {
    store: PropertyStore,
    state: StateMachine<ModificationState>,
    validator: Validator,
    config: ObjectConfig,
    hooks: H,
    active: Option<ActiveTransaction>,
    restore_state: Option<ModificationState>,
    /// Outstanding violations in deferred mode, by property.
    violations: BTreeMap<String, PropertyViolation>,
    /// Events raised under the mutex, emitted after it is released.
    pending: Vec<EventKind>,
}

struct ObjectShared<H> {
    id: ObjectId,
    inner: Mutex<ObjectInner<H>>,
    lock: TransactionLock,
    feed: EventFeed,
}

/// A record with tracked modification state, validation, restore points and
/// transactions.
///
/// `PersistedObject` is a cheap handle: clones refer to the same record and
/// may be used from several threads.
///
/// # Example
///
/// ```rust
/// use recordkit_core::{ModificationState, NoopHooks, PersistedObject, StringLength};
///
/// let person = PersistedObject::new(NoopHooks);
/// person.add_rule("Name", StringLength::new(0, 20));
///
/// person.set_property("Name", "Bob").unwrap();
/// assert_eq!(person.state(), ModificationState::New);
///
/// person.save().unwrap();
/// person.set_property("Name", "Alice").unwrap();
/// assert_eq!(person.state(), ModificationState::Modified);
/// ```
pub struct PersistedObject<H> {
    shared: Arc<ObjectShared<H>>,
}

impl<H> Clone for PersistedObject<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<H: PersistenceHooks + 'static> PersistedObject<H> {
    /// Creates a `New` object with default configuration.
    pub fn new(hooks: H) -> Self {
        Self::with_config(hooks, ObjectConfig::default())
    }

    /// Creates a `New` object.
    pub fn with_config(hooks: H, config: ObjectConfig) -> Self {
        let id = ObjectId::new();
        let feed = EventFeed::new(id, config.max_event_history);
        Self {
            shared: Arc::new(ObjectShared {
                id,
                inner: Mutex::new(ObjectInner {
                    store: PropertyStore::new(),
                    state: StateMachine::modification(),
                    validator: Validator::new(),
                    config,
                    hooks,
                    active: None,
                    restore_state: None,
                    violations: BTreeMap::new(),
                    pending: Vec::new(),
                }),
                lock: TransactionLock::new(),
                feed,
            }),
        }
    }

    /// Returns the object ID.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.shared.id
    }

    /// Returns the modification state.
    #[must_use]
    pub fn state(&self) -> ModificationState {
        self.shared.inner.lock().state.state()
    }

    /// Returns true if both handles refer to the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // ------------------------------------------------------------------
    // Rules and notifications
    // ------------------------------------------------------------------

    /// Adds a standard validation rule for `property`.
    pub fn add_rule(&self, property: impl Into<String>, rule: impl ValidationRule + 'static) {
        self.shared.inner.lock().validator.add_rule(property, rule);
    }

    /// Adds a closure validation rule for `property`.
    pub fn add_rule_fn<F>(&self, property: impl Into<String>, rule: F)
    where
        F: Fn(&Value, &mut Vec<String>) -> bool + Send + Sync + 'static,
    {
        self.shared.inner.lock().validator.add_rule_fn(property, rule);
    }

    /// Subscribes to this object's events.
    pub fn subscribe(&self) -> Receiver<ObjectEvent> {
        self.shared.feed.subscribe()
    }

    /// Returns recent events with sequence > cursor, up to limit.
    #[must_use]
    pub fn poll_events(&self, cursor: u64, limit: usize) -> Vec<ObjectEvent> {
        self.shared.feed.poll(cursor, limit)
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Reads `name` as `T`; missing or null reads as `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is of another kind.
    pub fn get_property<T: FromValue + Default>(&self, name: &str) -> CoreResult<T> {
        self.shared.inner.lock().store.get(name)
    }

    /// Returns the raw stored value of `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<Value> {
        self.shared.inner.lock().store.value(name).cloned()
    }

    /// Returns a copy of all properties.
    #[must_use]
    pub fn data(&self) -> Document {
        self.shared.inner.lock().store.data().clone()
    }

    /// Writes a property outside any transaction.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the object is deleted, the property is
    ///   read-only, or a transaction holds the object
    /// - `ValidationFailed` if a rule rejects the value (immediate mode)
    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> CoreResult<()> {
        self.write(None, name, value.into())
    }

    /// Writes a property as part of `txn`, which must be enlisted.
    ///
    /// A validation failure rolls back every write `txn` made to this object
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// As [`set_property`](Self::set_property), plus `InvalidOperation` if
    /// `txn` is not enlisted here and `UndoFailed` if the rollback fails.
    pub fn set_property_in(
        &self,
        txn: &Transaction,
        name: &str,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        self.write(Some(txn.id()), name, value.into())
    }

    fn write(&self, txn: Option<TransactionId>, name: &str, value: Value) -> CoreResult<()> {
        self.with_inner(|inner| inner.write_property(txn, name, value))
    }

    /// Outstanding violations recorded in deferred validation mode.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<PropertyViolation> {
        self.shared
            .inner
            .lock()
            .violations
            .values()
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Saves through the create or update hook, depending on state.
    ///
    /// `New` creates, `Modified` updates; both end `Unmodified`. `Unmodified`
    /// and `Deleted` objects are left alone.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if a transaction holds the object
    /// - `PersistenceFailed` if the hook fails (data and state are unchanged)
    /// - `ValidationFailed` listing every outstanding violation in deferred
    ///   mode
    pub fn save(&self) -> CoreResult<()> {
        self.with_inner(|inner| inner.save(None))
    }

    /// Saves as part of `txn`, which must be enlisted.
    ///
    /// What was stored becomes the rollback point of `txn`: a later rollback
    /// only undoes writes made after the save.
    ///
    /// # Errors
    ///
    /// As [`save`](Self::save), with `InvalidOperation` if `txn` is not
    /// enlisted here.
    pub fn save_in(&self, txn: &Transaction) -> CoreResult<()> {
        self.with_inner(|inner| inner.save(Some(txn.id())))
    }

    /// Reloads all properties through the fetch hook.
    ///
    /// The state becomes `Unmodified` whatever it was and any restore point
    /// is discarded.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` while a transaction is enlisted, or
    /// `PersistenceFailed` if the hook fails.
    pub fn fetch(&self) -> CoreResult<()> {
        self.with_inner(ObjectInner::fetch)
    }

    /// Deletes through the delete hook and moves to `Deleted`.
    ///
    /// A `New` object was never persisted, so the hook is skipped.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if a transaction holds the object,
    /// `IllegalTransition` if already deleted, or `PersistenceFailed` if the
    /// hook fails.
    pub fn delete(&self) -> CoreResult<()> {
        self.with_inner(|inner| inner.delete(None))
    }

    /// Deletes as part of `txn`, which must be enlisted.
    ///
    /// A deleted object cannot be rolled back; rolling back `txn` afterwards
    /// fails and the object stays `Deleted`.
    ///
    /// # Errors
    ///
    /// As [`delete`](Self::delete), with `InvalidOperation` if `txn` is not
    /// enlisted here.
    pub fn delete_in(&self, txn: &Transaction) -> CoreResult<()> {
        self.with_inner(|inner| inner.delete(Some(txn.id())))
    }

    /// Runs `f` with the hooks, for adapters that expose extra state.
    pub fn with_hooks<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.shared.inner.lock().hooks)
    }

    // ------------------------------------------------------------------
    // Restore points
    // ------------------------------------------------------------------

    /// Snapshots the properties and the modification state.
    pub fn set_restore_point(&self) {
        let mut inner = self.shared.inner.lock();
        inner.store.set_restore_point();
        inner.restore_state = Some(inner.state.state());
        tracing::debug!(object = %self.shared.id, "restore point set");
    }

    /// Returns the properties and state to the last restore point.
    ///
    /// Does nothing if there is no restore point, so calling it twice is
    /// safe. Returns true if a restore point was applied.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if a transaction holds the object or the object is
    /// deleted.
    pub fn revert_to_restore_point(&self) -> CoreResult<bool> {
        self.with_inner(ObjectInner::revert_to_restore_point)
    }

    /// Returns true if a restore point is held.
    #[must_use]
    pub fn has_restore_point(&self) -> bool {
        self.shared.inner.lock().store.has_restore_point()
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Starts a transaction and enlists this object in it.
    ///
    /// Blocks while another transaction holds the object; waiters are
    /// admitted in arrival order.
    ///
    /// # Errors
    ///
    /// `TransactionAlreadyActive` if the calling thread already has a
    /// transaction open on this object, `InvalidOperation` if the object is
    /// deleted.
    pub fn begin_transaction(&self) -> CoreResult<Transaction> {
        self.shared.inner.lock().check_not_held_by_caller()?;
        let txn = Transaction::new();
        self.enlist(&txn)?;
        Ok(txn)
    }

    /// Enlists this object in an existing transaction.
    ///
    /// Blocks until `txn` is admitted. When `txn` completes, this object
    /// commits or rolls back accordingly and releases its lock.
    ///
    /// # Errors
    ///
    /// - `TransactionAlreadyActive` if `txn` is already enlisted here, or the
    ///   calling thread holds this object with another transaction
    /// - `TransactionCompleted` if `txn` completed before it was admitted
    /// - `InvalidOperation` if the object is deleted
    pub fn enlist(&self, txn: &Transaction) -> CoreResult<()> {
        let id = txn.id();
        if !txn.is_active() {
            return Err(CoreError::TransactionCompleted { id });
        }
        {
            let inner = self.shared.inner.lock();
            inner.check_enlistable(id)?;
            inner.check_not_held_by_caller()?;
        }

        match self.shared.lock.acquire(txn) {
            Admission::Granted => {}
            // Another call is enlisting the same transaction.
            Admission::AlreadyHeld => return Err(CoreError::TransactionAlreadyActive { id }),
            Admission::Completed => return Err(CoreError::TransactionCompleted { id }),
        }

        {
            let mut inner = self.shared.inner.lock();
            if let Err(e) = inner.check_enlistable(id) {
                drop(inner);
                self.shared.lock.release(id);
                return Err(e);
            }
            let state = inner.state.state();
            inner.active = Some(ActiveTransaction {
                data: TransactionData::new(id, state),
                owner: thread::current().id(),
            });
        }
        tracing::debug!(object = %self.shared.id, txn = %id, "transaction begun");

        let object: Weak<ObjectShared<H>> = Arc::downgrade(&self.shared);
        txn.on_complete(move |outcome| {
            if let Some(shared) = object.upgrade() {
                PersistedObject { shared }.complete(id, outcome);
            }
        });
        Ok(())
    }

    /// Discards the memento of `txn`, keeping the current values.
    ///
    /// The transaction stays enlisted; later writes are backed up afresh.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if `txn` is not enlisted here.
    pub fn commit(&self, txn: &Transaction) -> CoreResult<()> {
        let mut inner = self.shared.inner.lock();
        inner.commit_active(txn.id())?;
        tracing::debug!(object = %self.shared.id, txn = %txn.id(), "transaction committed");
        Ok(())
    }

    /// Restores every property written under `txn`, and the state, to their
    /// values at begin or the last commit.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if `txn` is not enlisted here, `UndoFailed` if a
    /// value cannot be written back.
    pub fn rollback(&self, txn: &Transaction) -> CoreResult<()> {
        self.with_inner(|inner| {
            inner.require_enlisted(txn.id())?;
            inner.rollback_active()
        })?;
        tracing::debug!(object = %self.shared.id, txn = %txn.id(), "transaction rolled back");
        Ok(())
    }

    /// Ends this object's part in `txn`, committing anything outstanding,
    /// and releases the object for the next transaction.
    ///
    /// The transaction handle itself is not completed.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if `txn` is not enlisted here.
    pub fn end_transaction(&self, txn: &Transaction) -> CoreResult<()> {
        let id = txn.id();
        {
            let mut inner = self.shared.inner.lock();
            inner.commit_active(id)?;
            inner.active = None;
        }
        self.shared.lock.release(id);
        tracing::debug!(object = %self.shared.id, txn = %id, "transaction ended");
        Ok(())
    }

    /// Returns the transaction enlisted here, if any.
    #[must_use]
    pub fn active_transaction(&self) -> Option<TransactionId> {
        self.shared
            .inner
            .lock()
            .active
            .as_ref()
            .map(|a| a.data.id())
    }

    /// Returns true if a write failed validation during the enlisted
    /// transaction.
    #[must_use]
    pub fn has_transaction_failed(&self) -> bool {
        self.shared
            .inner
            .lock()
            .active
            .as_ref()
            .is_some_and(|a| a.data.has_failed())
    }

    /// Error messages recorded during the enlisted transaction.
    #[must_use]
    pub fn transaction_errors(&self) -> Vec<String> {
        self.shared
            .inner
            .lock()
            .active
            .as_ref()
            .map(|a| a.data.errors().to_vec())
            .unwrap_or_default()
    }

    /// Completion callback registered by `enlist`.
    fn complete(&self, id: TransactionId, outcome: TransactionOutcome) {
        let (result, events) = {
            let mut inner = self.shared.inner.lock();
            let enlisted = inner.active.as_ref().is_some_and(|a| a.data.id() == id);
            let result = if enlisted {
                let result = match outcome {
                    TransactionOutcome::Committed => inner.commit_active(id),
                    TransactionOutcome::Aborted => inner.rollback_active(),
                };
                inner.active = None;
                result
            } else {
                Ok(())
            };
            (result, std::mem::take(&mut inner.pending))
        };
        self.shared.lock.release(id);
        self.emit_all(events);

        match result {
            Ok(()) => tracing::debug!(object = %self.shared.id, txn = %id, ?outcome, "transaction finished"),
            Err(e) => tracing::error!(
                object = %self.shared.id,
                txn = %id,
                error = %e,
                "rollback on transaction completion failed"
            ),
        }
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut ObjectInner<H>) -> CoreResult<R>) -> CoreResult<R> {
        let (result, events) = {
            let mut inner = self.shared.inner.lock();
            let result = f(&mut inner);
            (result, std::mem::take(&mut inner.pending))
        };
        self.emit_all(events);
        result
    }

    fn emit_all(&self, events: Vec<EventKind>) {
        for kind in events {
            self.shared.feed.emit(kind);
        }
    }
}

impl<H> std::fmt::Debug for PersistedObject<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedObject")
            .field("id", &self.shared.id)
            .finish_non_exhaustive()
    }
}

impl<H: PersistenceHooks> ObjectInner<H> {
    fn check_enlistable(&self, id: TransactionId) -> CoreResult<()> {
        if let Some(active) = &self.active {
            if active.data.id() == id {
                return Err(CoreError::TransactionAlreadyActive { id });
            }
        }
        if self.state.state() == ModificationState::Deleted {
            return Err(CoreError::invalid_operation(
                "cannot begin a transaction on a deleted object",
            ));
        }
        Ok(())
    }

    /// Waiting on a transaction the calling thread holds would never end.
    fn check_not_held_by_caller(&self) -> CoreResult<()> {
        match &self.active {
            Some(active) if active.owner == thread::current().id() => {
                Err(CoreError::TransactionAlreadyActive {
                    id: active.data.id(),
                })
            }
            _ => Ok(()),
        }
    }

    fn require_enlisted(&self, id: TransactionId) -> CoreResult<()> {
        match &self.active {
            Some(active) if active.data.id() == id => Ok(()),
            _ => Err(CoreError::invalid_operation(format!(
                "transaction {id} is not enlisted in this object"
            ))),
        }
    }

    /// Only the enlisted transaction may change a held object.
    fn check_holder(&self, txn: Option<TransactionId>) -> CoreResult<()> {
        match (&self.active, txn) {
            (None, None) => Ok(()),
            (Some(active), Some(id)) if active.data.id() == id => Ok(()),
            (Some(active), None) => Err(CoreError::invalid_operation(format!(
                "object is held by transaction {}",
                active.data.id()
            ))),
            (_, Some(id)) => Err(CoreError::invalid_operation(format!(
                "transaction {id} is not enlisted in this object"
            ))),
        }
    }

    fn write_property(
        &mut self,
        txn: Option<TransactionId>,
        name: &str,
        value: Value,
    ) -> CoreResult<()> {
        if self.state.state() == ModificationState::Deleted {
            return Err(CoreError::invalid_operation(format!(
                "cannot set '{name}' on a deleted object"
            )));
        }
        if self.config.is_read_only(name) {
            return Err(CoreError::invalid_operation(format!(
                "property '{name}' is read-only"
            )));
        }
        self.check_holder(txn)?;

        let current = self.store.value(name).cloned();
        if current.as_ref().map_or(true, Value::is_null) && value.is_null() {
            return Ok(());
        }

        let verdict = self.validator.validate(name, &value);
        if verdict.valid {
            self.violations.remove(name);
        } else {
            let violation = PropertyViolation::new(name, value.clone(), verdict.messages);
            match self.config.validation_mode {
                ValidationMode::Immediate => return Err(self.reject(violation)),
                ValidationMode::Deferred => {
                    tracing::warn!(property = name, %value, "deferred validation failure");
                    self.violations.insert(name.to_string(), violation);
                }
            }
        }

        if current.as_ref() == Some(&value) {
            return Ok(());
        }

        if let Some(active) = self.active.as_mut() {
            active.data.backup_property(name, current);
        }
        if self.state.state() == ModificationState::Unmodified {
            self.state.transition(ModificationState::Modified)?;
        }
        tracing::trace!(property = name, %value, "property set");
        self.store.set(name, value);
        self.pending.push(EventKind::PropertyChanged {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Builds the error for a rejected write, rolling back the enlisted
    /// transaction first. A failed rollback is reported instead.
    fn reject(&mut self, violation: PropertyViolation) -> CoreError {
        tracing::warn!(
            property = %violation.property,
            value = %violation.value,
            "property write rejected by validation"
        );
        if let Some(active) = self.active.as_mut() {
            active.data.mark_failed();
            active.data.add_errors(violation.messages.iter().cloned());
            if let Err(undo) = self.rollback_active() {
                return undo;
            }
        }
        CoreError::ValidationFailed(ValidationFailure::single(violation))
    }

    fn commit_active(&mut self, id: TransactionId) -> CoreResult<()> {
        self.require_enlisted(id)?;
        let state = self.state.state();
        if let Some(active) = self.active.as_mut() {
            active.data.reset(state);
        }
        Ok(())
    }

    fn rollback_active(&mut self) -> CoreResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        active.data.set_rolling_back(true);
        let memento = active.data.clone();
        let result = memento
            .restore(self)
            .and_then(|()| self.return_to_state(memento.state_backup()));
        if let Some(active) = self.active.as_mut() {
            if result.is_ok() {
                active.data.rebase(self.state.state());
            }
            active.data.set_rolling_back(false);
        }
        result
    }

    /// Puts the state back to `state`. Nothing leaves `Deleted`.
    fn return_to_state(&mut self, state: ModificationState) -> CoreResult<()> {
        if self.state.state() == ModificationState::Deleted {
            return Err(CoreError::invalid_operation(format!(
                "cannot return a deleted object to {state}"
            )));
        }
        self.state.restore(state);
        Ok(())
    }

    fn revert_to_restore_point(&mut self) -> CoreResult<bool> {
        self.check_holder(None)?;
        if self.state.state() == ModificationState::Deleted {
            return Err(CoreError::invalid_operation(
                "cannot revert a deleted object",
            ));
        }
        let before = self.store.data().clone();
        if !self.store.revert_to_restore_point() {
            return Ok(false);
        }
        if let Some(state) = self.restore_state.take() {
            self.return_to_state(state)?;
        }

        let after = self.store.data().clone();
        let changed: Vec<String> = before
            .keys()
            .chain(after.keys())
            .filter(|name| before.get(name) != after.get(name))
            .cloned()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        for name in changed {
            self.revalidate(&name);
            self.pending.push(EventKind::PropertyChanged { name });
        }
        tracing::debug!(state = %self.state.state(), "reverted to restore point");
        Ok(true)
    }

    /// Recomputes the deferred violation for `name` after a write that
    /// bypassed validation.
    fn revalidate(&mut self, name: &str) {
        if self.config.validation_mode != ValidationMode::Deferred {
            return;
        }
        let value = self.store.value(name).cloned().unwrap_or(Value::Null);
        let verdict = self.validator.validate(name, &value);
        if verdict.valid {
            self.violations.remove(name);
        } else {
            self.violations.insert(
                name.to_string(),
                PropertyViolation::new(name, value, verdict.messages),
            );
        }
    }

    fn apply_hook_data(&mut self, data: Document) {
        for (name, value) in data {
            if self.store.value(&name) != Some(&value) {
                self.store.set(name, value);
            }
        }
    }

    fn save(&mut self, txn: Option<TransactionId>) -> CoreResult<()> {
        self.check_holder(txn)?;
        if !self.violations.is_empty() {
            let violations = self.violations.values().cloned().collect();
            return Err(CoreError::ValidationFailed(
                ValidationFailure::from_violations(violations),
            ));
        }

        match self.state.state() {
            ModificationState::New => {
                let mut data = self.store.data().clone();
                self.hooks.create_data(&mut data)?;
                self.apply_hook_data(data);
                self.state.transition(ModificationState::Unmodified)?;
                self.pending.push(EventKind::Created);
            }
            ModificationState::Modified => {
                let mut data = self.store.data().clone();
                self.hooks.update_data(&mut data)?;
                self.apply_hook_data(data);
                self.state.transition(ModificationState::Unmodified)?;
                self.pending.push(EventKind::Updated);
            }
            ModificationState::Unmodified | ModificationState::Deleted => return Ok(()),
        }
        // The store now holds these values; rollback must not undo them.
        if let Some(active) = self.active.as_mut() {
            active.data.rebase(ModificationState::Unmodified);
        }
        Ok(())
    }

    fn fetch(&mut self) -> CoreResult<()> {
        if let Some(active) = &self.active {
            return Err(CoreError::invalid_operation(format!(
                "cannot fetch while transaction {} is enlisted",
                active.data.id()
            )));
        }
        let data = self.hooks.fetch_data(self.store.data())?;
        self.store.inject_data(data);
        self.restore_state = None;
        self.violations.clear();
        self.state.restore(ModificationState::Unmodified);
        self.pending.push(EventKind::Fetched);
        tracing::debug!("object fetched");
        Ok(())
    }

    fn delete(&mut self, txn: Option<TransactionId>) -> CoreResult<()> {
        self.check_holder(txn)?;
        let from = self.state.state();
        if !self.state.can_transition(ModificationState::Deleted) {
            return Err(CoreError::IllegalTransition {
                from,
                to: ModificationState::Deleted,
            });
        }
        if from != ModificationState::New {
            self.hooks.delete_data(self.store.data())?;
        }
        self.state.transition(ModificationState::Deleted)?;
        self.pending.push(EventKind::Deleted);
        Ok(())
    }
}

impl<H> RestoreTarget for ObjectInner<H> {
    fn is_writable(&self, property: &str) -> bool {
        !self.config.is_read_only(property)
    }

    fn restore_property(&mut self, property: &str, value: Option<Value>) -> CoreResult<()> {
        debug_assert!(
            self.active.as_ref().is_some_and(|a| a.data.is_rolling_back()),
            "restore outside a rollback"
        );
        if self.state.state() == ModificationState::Deleted {
            return Err(CoreError::invalid_operation(format!(
                "cannot restore '{property}' on a deleted object"
            )));
        }
        let changed = match value {
            Some(value) => self.store.set(property, value.clone()) != Some(value),
            None => self.store.remove(property).is_some(),
        };
        if self.config.validation_mode == ValidationMode::Deferred {
            let value = self.store.value(property).cloned().unwrap_or(Value::Null);
            let verdict = self.validator.validate(property, &value);
            if verdict.valid {
                self.violations.remove(property);
            } else {
                self.violations.insert(
                    property.to_string(),
                    PropertyViolation::new(property, value, verdict.messages),
                );
            }
        }
        if changed {
            self.pending.push(EventKind::PropertyChanged {
                name: property.to_string(),
            });
        }
        Ok(())
    }
}
