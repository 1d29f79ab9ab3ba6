//! FIFO admission lock for transactions on one object.

use crate::transaction::handle::Transaction;
use crate::types::TransactionId;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// Result of [`TransactionLock::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The transaction now holds the lock.
    Granted,
    /// The transaction already held the lock.
    AlreadyHeld,
    /// The transaction completed while queued and was never admitted.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitState {
    Waiting,
    Granted,
    Cancelled,
}

struct Waiter {
    txn: TransactionId,
    state: Mutex<WaitState>,
    signal: Condvar,
}

#[derive(Default)]
struct LockState {
    current: Option<TransactionId>,
    queue: VecDeque<Arc<Waiter>>,
}

/// Serializes transactions on one object.
///
/// At most one transaction holds the lock. Others block in
/// [`acquire`](Self::acquire) and are admitted in arrival order as the holder
/// [`release`](Self::release)s. A waiter whose transaction completes while it
/// is queued is removed and unblocked without being admitted.
///
/// Lock ordering: the internal state mutex is always taken before a waiter's
/// mutex.
#[derive(Clone, Default)]
pub struct TransactionLock {
    state: Arc<Mutex<LockState>>,
}

impl TransactionLock {
    /// Creates an unlocked lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `txn`, blocking while another transaction holds the lock.
    pub fn acquire(&self, txn: &Transaction) -> Admission {
        let id = txn.id();
        let waiter = {
            let mut state = self.state.lock();
            if state.current == Some(id) {
                return Admission::AlreadyHeld;
            }
            if state.current.is_none() {
                state.current = Some(id);
                tracing::debug!(txn = %id, "transaction lock granted");
                return Admission::Granted;
            }
            let waiter = Arc::new(Waiter {
                txn: id,
                state: Mutex::new(WaitState::Waiting),
                signal: Condvar::new(),
            });
            state.queue.push_back(Arc::clone(&waiter));
            tracing::debug!(
                txn = %id,
                position = state.queue.len(),
                "transaction queued for lock"
            );
            waiter
        };

        let lock_state: Weak<Mutex<LockState>> = Arc::downgrade(&self.state);
        let cancelled = Arc::clone(&waiter);
        txn.on_complete(move |_| Self::cancel(&lock_state, &cancelled));

        let mut wait_state = waiter.state.lock();
        while *wait_state == WaitState::Waiting {
            waiter.signal.wait(&mut wait_state);
        }
        if *wait_state == WaitState::Granted {
            Admission::Granted
        } else {
            Admission::Completed
        }
    }

    fn cancel(lock_state: &Weak<Mutex<LockState>>, waiter: &Arc<Waiter>) {
        let Some(lock_state) = lock_state.upgrade() else {
            return;
        };
        let mut state = lock_state.lock();
        state.queue.retain(|queued| !Arc::ptr_eq(queued, waiter));

        let mut wait_state = waiter.state.lock();
        if *wait_state == WaitState::Waiting {
            *wait_state = WaitState::Cancelled;
            waiter.signal.notify_one();
            tracing::warn!(txn = %waiter.txn, "transaction completed while queued for lock");
        }
    }

    /// Releases the lock if `id` holds it, admitting the next waiter.
    ///
    /// Returns false if `id` was not the holder.
    pub fn release(&self, id: TransactionId) -> bool {
        let mut state = self.state.lock();
        if state.current != Some(id) {
            return false;
        }
        state.current = None;

        while let Some(next) = state.queue.pop_front() {
            let mut wait_state = next.state.lock();
            if *wait_state == WaitState::Waiting {
                *wait_state = WaitState::Granted;
                state.current = Some(next.txn);
                next.signal.notify_one();
                tracing::debug!(released = %id, granted = %next.txn, "transaction lock handed over");
                break;
            }
        }
        true
    }

    /// The current holder.
    #[must_use]
    pub fn holder(&self) -> Option<TransactionId> {
        self.state.lock().current
    }

    /// Transactions waiting, in admission order.
    #[must_use]
    pub fn queued(&self) -> Vec<TransactionId> {
        self.state.lock().queue.iter().map(|w| w.txn).collect()
    }
}

impl std::fmt::Debug for TransactionLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransactionLock")
            .field("current", &state.current)
            .field("queued", &state.queue.len())
            .finish()
    }
}
