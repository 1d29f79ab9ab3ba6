//! Explicit transaction handle.

use crate::types::TransactionId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TXID: AtomicU64 = AtomicU64::new(1);

/// How a transaction completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Enlisted objects keep their changes.
    Committed,
    /// Enlisted objects roll back their changes.
    Aborted,
}

type CompletionCallback = Box<dyn FnOnce(TransactionOutcome) + Send>;

struct CompletionState {
    outcome: Option<TransactionOutcome>,
    callbacks: Vec<CompletionCallback>,
}

struct TransactionInner {
    id: TransactionId,
    state: Mutex<CompletionState>,
}

impl TransactionInner {
    fn complete(&self, outcome: TransactionOutcome) -> bool {
        let callbacks = {
            let mut state = self.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome);
            std::mem::take(&mut state.callbacks)
        };

        tracing::debug!(txn = %self.id, ?outcome, callbacks = callbacks.len(), "transaction completed");
        for callback in callbacks {
            callback(outcome);
        }
        true
    }
}

impl Drop for TransactionInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.outcome.is_some() {
            return;
        }
        state.outcome = Some(TransactionOutcome::Aborted);
        let callbacks = std::mem::take(&mut state.callbacks);
        if !callbacks.is_empty() {
            tracing::debug!(txn = %self.id, "transaction dropped without completion, aborting");
        }
        for callback in callbacks {
            callback(TransactionOutcome::Aborted);
        }
    }
}

/// A cloneable handle to one transaction.
///
/// Every clone refers to the same transaction. It completes exactly once,
/// through [`commit`](Self::commit), [`abort`](Self::abort), or when the
/// last handle is dropped (which aborts).
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TransactionInner>,
}

impl Transaction {
    /// Starts a new, uncompleted transaction with a fresh ID.
    #[must_use]
    pub fn new() -> Self {
        let id = TransactionId::new(NEXT_TXID.fetch_add(1, Ordering::SeqCst));
        Self {
            inner: Arc::new(TransactionInner {
                id,
                state: Mutex::new(CompletionState {
                    outcome: None,
                    callbacks: Vec::new(),
                }),
            }),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.inner.id
    }

    /// Returns the outcome, or `None` while the transaction is open.
    #[must_use]
    pub fn outcome(&self) -> Option<TransactionOutcome> {
        self.inner.state.lock().outcome
    }

    /// Returns true if the transaction has not completed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.outcome().is_none()
    }

    /// Completes the transaction as committed.
    ///
    /// Returns false if it had already completed.
    pub fn commit(&self) -> bool {
        self.inner.complete(TransactionOutcome::Committed)
    }

    /// Completes the transaction as aborted.
    ///
    /// Returns false if it had already completed.
    pub fn abort(&self) -> bool {
        self.inner.complete(TransactionOutcome::Aborted)
    }

    /// Registers a callback to run on completion.
    ///
    /// Runs immediately, on the calling thread, if the transaction has
    /// already completed. Callbacks never run while internal locks are held.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(TransactionOutcome) + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        match state.outcome {
            Some(outcome) => {
                drop(state);
                callback(outcome);
            }
            None => state.callbacks.push(Box::new(callback)),
        }
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Transaction {}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id())
            .field("outcome", &self.outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn new_transaction_is_active() {
        let txn = Transaction::new();
        assert!(txn.is_active());
        assert_eq!(txn.outcome(), None);
    }

    #[test]
    fn ids_increase() {
        let a = Transaction::new();
        let b = Transaction::new();
        assert!(b.id() > a.id());
    }

    #[test]
    fn completes_once() {
        let txn = Transaction::new();
        assert!(txn.commit());
        assert!(!txn.abort());
        assert_eq!(txn.outcome(), Some(TransactionOutcome::Committed));
    }

    #[test]
    fn callbacks_receive_outcome() {
        let txn = Transaction::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            txn.on_complete(move |outcome| seen.lock().push(outcome));
        }
        txn.abort();
        assert_eq!(
            *seen.lock(),
            vec![TransactionOutcome::Aborted, TransactionOutcome::Aborted]
        );
    }

    #[test]
    fn late_callback_runs_immediately() {
        let txn = Transaction::new();
        txn.commit();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        txn.on_complete(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_last_handle_aborts() {
        let seen = Arc::new(Mutex::new(None));
        {
            let txn = Transaction::new();
            let clone = txn.clone();
            let seen = Arc::clone(&seen);
            txn.on_complete(move |outcome| *seen.lock() = Some(outcome));
            drop(txn);
            assert!(clone.is_active());
        }
        assert_eq!(*seen.lock(), Some(TransactionOutcome::Aborted));
    }

    #[test]
    fn callback_may_register_another() {
        let txn = Transaction::new();
        let inner = txn.clone();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        txn.on_complete(move |_| {
            let counter = Arc::clone(&counter);
            inner.on_complete(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });
        txn.commit();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
