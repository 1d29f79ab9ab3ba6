//! Collections of persisted objects.
//!
//! A [`PersistedCollection`] forwards `save` and `delete` to its children and
//! drops children that report [`EventKind::Deleted`]. Collection transactions
//! enlist every child into one shared [`Transaction`] and restore the
//! membership on rollback.

use crate::error::{CoreError, CoreResult};
use crate::events::{EventKind, ObjectEvent};
use crate::hooks::PersistenceHooks;
use crate::object::PersistedObject;
use crate::state::ModificationState;
use crate::transaction::{Transaction, TransactionOutcome};
use crate::types::{ObjectId, TransactionId};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};

/// A child and the collection's subscription to it.
///
/// Dropping a member drops the receiver, which unsubscribes it on the
/// child's next event.
struct Member<H> {
    object: PersistedObject<H>,
    events: Receiver<ObjectEvent>,
}

impl<H: PersistenceHooks + 'static> Member<H> {
    fn new(object: PersistedObject<H>) -> Self {
        let events = object.subscribe();
        Self { object, events }
    }

    fn id(&self) -> ObjectId {
        self.object.id()
    }

    /// Drains pending events; true if one of them was a deletion.
    fn was_deleted(&self) -> bool {
        self.events
            .try_iter()
            .fold(false, |deleted, e| deleted || e.kind == EventKind::Deleted)
    }
}

struct CollectionTxn<H> {
    id: TransactionId,
    enlisted: Vec<PersistedObject<H>>,
    /// Membership at begin or the last commit.
    snapshot: Vec<PersistedObject<H>>,
}

struct CollectionState<H> {
    items: Vec<Member<H>>,
    txn: Option<CollectionTxn<H>>,
}

impl<H: PersistenceHooks + 'static> CollectionState<H> {
    fn position(&self, id: ObjectId) -> Option<usize> {
        self.items.iter().position(|m| m.id() == id)
    }

    fn objects(&self) -> Vec<PersistedObject<H>> {
        self.items.iter().map(|m| m.object.clone()).collect()
    }

    /// Drops children that reported deletion since the last call.
    fn prune(&mut self) {
        let before = self.items.len();
        self.items.retain(|m| !m.was_deleted());
        let removed = before - self.items.len();
        if removed > 0 {
            tracing::debug!(removed, "deleted children pruned");
        }
    }

    fn restore_membership(&mut self) {
        let Some(txn) = &self.txn else {
            return;
        };
        let mut current: HashMap<ObjectId, Member<H>> =
            self.items.drain(..).map(|m| (m.id(), m)).collect();
        self.items = txn
            .snapshot
            .iter()
            .filter(|o| o.state() != ModificationState::Deleted)
            .map(|o| {
                current
                    .remove(&o.id())
                    .unwrap_or_else(|| Member::new(o.clone()))
            })
            .collect();
    }
}

/// An ordered list of persisted objects.
///
/// # Example
///
/// ```rust
/// use recordkit_core::{NoopHooks, PersistedCollection, PersistedObject};
///
/// let people = PersistedCollection::new();
/// let bob = PersistedObject::new(NoopHooks);
/// bob.set_property("Name", "Bob").unwrap();
/// people.push(bob.clone());
///
/// people.save().unwrap();
/// bob.delete().unwrap();
/// assert!(people.is_empty());
/// ```
pub struct PersistedCollection<H> {
    state: Arc<Mutex<CollectionState<H>>>,
}

impl<H: PersistenceHooks + 'static> Default for PersistedCollection<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: PersistenceHooks + 'static> PersistedCollection<H> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CollectionState {
                items: Vec::new(),
                txn: None,
            })),
        }
    }

    /// Locks the state with deleted children already pruned.
    fn pruned(&self) -> MutexGuard<'_, CollectionState<H>> {
        let mut state = self.state.lock();
        state.prune();
        state
    }

    fn items(&self) -> Vec<PersistedObject<H>> {
        self.pruned().objects()
    }

    /// Appends `object`. Returns false if it is already a member.
    pub fn push(&self, object: PersistedObject<H>) -> bool {
        let mut state = self.pruned();
        if state.position(object.id()).is_some() {
            return false;
        }
        state.items.push(Member::new(object));
        true
    }

    /// Inserts `object` at `index`.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if `index` is past the end or the object is
    /// already a member.
    pub fn insert(&self, index: usize, object: PersistedObject<H>) -> CoreResult<()> {
        let mut state = self.pruned();
        if index > state.items.len() {
            return Err(CoreError::invalid_operation(format!(
                "index {index} out of range for collection of {}",
                state.items.len()
            )));
        }
        if state.position(object.id()).is_some() {
            return Err(CoreError::invalid_operation(format!(
                "object {} is already a member",
                object.id()
            )));
        }
        state.items.insert(index, Member::new(object));
        Ok(())
    }

    /// Removes the member with `id`.
    pub fn remove(&self, id: ObjectId) -> Option<PersistedObject<H>> {
        let mut state = self.pruned();
        let index = state.position(id)?;
        Some(state.items.remove(index).object)
    }

    /// Returns the member at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<PersistedObject<H>> {
        let state = self.pruned();
        state.items.get(index).map(|m| m.object.clone())
    }

    /// Returns the member with `id`.
    #[must_use]
    pub fn get_by_id(&self, id: ObjectId) -> Option<PersistedObject<H>> {
        let state = self.pruned();
        let index = state.position(id)?;
        state.items.get(index).map(|m| m.object.clone())
    }

    /// Iterates over a snapshot of the members.
    pub fn iter(&self) -> std::vec::IntoIter<PersistedObject<H>> {
        self.items().into_iter()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pruned().items.len()
    }

    /// Returns true if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the object with `id` is a member.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.pruned().position(id).is_some()
    }

    /// Removes every member without deleting them.
    pub fn clear(&self) {
        self.pruned().items.clear();
    }

    /// Saves every member in order.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first member's error. Members held by a
    /// transaction refuse the save.
    pub fn save(&self) -> CoreResult<()> {
        for object in self.items() {
            object.save()?;
        }
        Ok(())
    }

    /// Deletes every member. Deleted members leave the collection.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first member's error.
    pub fn delete(&self) -> CoreResult<()> {
        let result = self
            .items()
            .iter()
            .filter(|o| o.state() != ModificationState::Deleted)
            .try_for_each(PersistedObject::delete);
        drop(self.pruned());
        result
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Starts a transaction and enlists every member in it.
    ///
    /// Completing the returned handle commits or rolls back every member;
    /// aborting it also restores the membership.
    ///
    /// # Errors
    ///
    /// `TransactionAlreadyActive` if a collection transaction is open, or the
    /// first member's enlist error (the transaction is then aborted).
    pub fn begin_transaction(&self) -> CoreResult<Transaction> {
        let members = {
            let mut state = self.state.lock();
            if let Some(txn) = &state.txn {
                return Err(CoreError::TransactionAlreadyActive { id: txn.id });
            }
            state.prune();
            state.objects()
        };

        let txn = Transaction::new();
        for object in &members {
            if let Err(e) = object.enlist(&txn) {
                txn.abort();
                return Err(e);
            }
        }

        let id = txn.id();
        {
            let mut state = self.state.lock();
            state.txn = Some(CollectionTxn {
                id,
                enlisted: members,
                snapshot: state.objects(),
            });
        }
        tracing::debug!(txn = %id, "collection transaction begun");

        let collection: Weak<Mutex<CollectionState<H>>> = Arc::downgrade(&self.state);
        txn.on_complete(move |outcome| {
            let Some(state) = collection.upgrade() else {
                return;
            };
            let mut state = state.lock();
            if state.txn.as_ref().map(|t| t.id) != Some(id) {
                return;
            }
            if outcome == TransactionOutcome::Aborted {
                state.restore_membership();
            }
            state.txn = None;
        });
        Ok(txn)
    }

    fn enlisted(&self, txn: &Transaction) -> CoreResult<Vec<PersistedObject<H>>> {
        match &self.state.lock().txn {
            Some(open) if open.id == txn.id() => Ok(open.enlisted.clone()),
            _ => Err(CoreError::invalid_operation(format!(
                "transaction {} is not open on this collection",
                txn.id()
            ))),
        }
    }

    /// Rolls back every enlisted member and restores the membership.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for an unknown handle; otherwise the first member's
    /// rollback error, after every member has been rolled back.
    pub fn rollback(&self, txn: &Transaction) -> CoreResult<()> {
        let result = first_error(self.enlisted(txn)?.iter().map(|o| o.rollback(txn)));
        self.state.lock().restore_membership();
        tracing::debug!(txn = %txn.id(), "collection transaction rolled back");
        result
    }

    /// Commits every enlisted member and records the current membership.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for an unknown handle; otherwise the first member's
    /// error, after every member has been committed.
    pub fn commit(&self, txn: &Transaction) -> CoreResult<()> {
        let result = first_error(self.enlisted(txn)?.iter().map(|o| o.commit(txn)));
        let mut state = self.pruned();
        let items = state.objects();
        if let Some(open) = state.txn.as_mut() {
            open.snapshot = items;
        }
        result
    }

    /// Ends every enlisted member's part in `txn` and closes the collection
    /// transaction.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for an unknown handle; otherwise the first member's
    /// error, after every member has been ended.
    pub fn end_transaction(&self, txn: &Transaction) -> CoreResult<()> {
        let result = first_error(
            self.enlisted(txn)?
                .iter()
                .map(|o| o.end_transaction(txn)),
        );
        self.state.lock().txn = None;
        tracing::debug!(txn = %txn.id(), "collection transaction ended");
        result
    }

    /// The open collection transaction, if any.
    #[must_use]
    pub fn active_transaction(&self) -> Option<TransactionId> {
        self.state.lock().txn.as_ref().map(|t| t.id)
    }

    /// Returns true if any enlisted member's transaction failed.
    #[must_use]
    pub fn has_transaction_failed(&self) -> bool {
        self.open_members()
            .iter()
            .any(PersistedObject::has_transaction_failed)
    }

    /// Error messages of every enlisted member, in member order.
    #[must_use]
    pub fn transaction_errors(&self) -> Vec<String> {
        self.open_members()
            .iter()
            .flat_map(PersistedObject::transaction_errors)
            .collect()
    }

    fn open_members(&self) -> Vec<PersistedObject<H>> {
        self.state
            .lock()
            .txn
            .as_ref()
            .map(|t| t.enlisted.clone())
            .unwrap_or_default()
    }
}

impl<H> std::fmt::Debug for PersistedCollection<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PersistedCollection")
            .field("len", &state.items.len())
            .field("txn", &state.txn.as_ref().map(|t| t.id))
            .finish()
    }
}

fn first_error(results: impl Iterator<Item = CoreResult<()>>) -> CoreResult<()> {
    let mut first = Ok(());
    for result in results {
        if let Err(e) = result {
            tracing::warn!(error = %e, "collection member failed");
            if first.is_ok() {
                first = Err(e);
            }
        }
    }
    first
}
