//! Modification state tracking.
//!
//! A [`StateMachine`] holds one current state and a transition table supplied
//! at construction. [`ModificationState::transitions`] is the table every
//! persisted object uses:
//!
//! ```text
//! New ──────► Unmodified ◄────► Modified
//!  │              │                 │
//!  └──────────────┴────► Deleted ◄──┘
//! ```

use crate::error::{CoreError, CoreResult};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Relationship of an object to its backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModificationState {
    /// Created in memory, never persisted.
    New,
    /// Matches the backing store.
    Unmodified,
    /// Has unsaved changes.
    Modified,
    /// Removed; accepts no further writes.
    Deleted,
}

impl ModificationState {
    /// All states.
    pub const ALL: [ModificationState; 4] = [
        ModificationState::New,
        ModificationState::Unmodified,
        ModificationState::Modified,
        ModificationState::Deleted,
    ];

    /// The legal edges between modification states.
    #[must_use]
    pub fn transitions() -> TransitionTable<Self> {
        use ModificationState::{Deleted, Modified, New, Unmodified};
        TransitionTable::new([
            (New, Unmodified),
            (New, Deleted),
            (Unmodified, Modified),
            (Unmodified, Deleted),
            (Modified, Unmodified),
            (Modified, Deleted),
        ])
    }
}

impl fmt::Display for ModificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "New",
            Self::Unmodified => "Unmodified",
            Self::Modified => "Modified",
            Self::Deleted => "Deleted",
        };
        f.write_str(name)
    }
}

/// Set of allowed `(from, to)` edges.
#[derive(Debug, Clone)]
pub struct TransitionTable<S> {
    arcs: HashSet<(S, S)>,
}

impl<S: Copy + Eq + Hash> TransitionTable<S> {
    /// Builds a table from its arcs.
    pub fn new(arcs: impl IntoIterator<Item = (S, S)>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Returns true if `from -> to` is an arc.
    #[must_use]
    pub fn allows(&self, from: S, to: S) -> bool {
        self.arcs.contains(&(from, to))
    }
}

/// A finite-state tracker validated against a [`TransitionTable`].
#[derive(Debug, Clone)]
pub struct StateMachine<S> {
    current: S,
    table: TransitionTable<S>,
}

impl<S: Copy + Eq + Hash> StateMachine<S> {
    /// Creates a machine in `initial` governed by `table`.
    pub fn new(initial: S, table: TransitionTable<S>) -> Self {
        Self {
            current: initial,
            table,
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> S {
        self.current
    }

    /// Returns true if moving to `to` is allowed from the current state.
    #[must_use]
    pub fn can_transition(&self, to: S) -> bool {
        self.table.allows(self.current, to)
    }

    /// Sets the state without consulting the table.
    ///
    /// Used to put back a state captured earlier by a restore point or a
    /// transaction memento.
    pub fn restore(&mut self, state: S) {
        self.current = state;
    }
}

impl StateMachine<ModificationState> {
    /// Creates a modification tracker starting in `New`.
    #[must_use]
    pub fn modification() -> Self {
        Self::new(ModificationState::New, ModificationState::transitions())
    }

    /// Moves to `to`, failing with `IllegalTransition` if the edge is not in
    /// the table. The state is unchanged on failure.
    pub fn transition(&mut self, to: ModificationState) -> CoreResult<()> {
        if !self.can_transition(to) {
            return Err(CoreError::IllegalTransition {
                from: self.current,
                to,
            });
        }
        tracing::debug!(from = %self.current, to = %to, "state transition");
        self.current = to;
        Ok(())
    }
}
