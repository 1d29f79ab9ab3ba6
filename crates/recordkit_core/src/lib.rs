//! # recordkit core
//!
//! Lifecycle engine for mutable, persisted records.
//!
//! This crate provides:
//! - Modification state tracking (`New`, `Unmodified`, `Modified`, `Deleted`)
//! - Per-property validation with standard and closure rules
//! - A single restore point per object
//! - Explicit transactions with first-write-wins rollback and FIFO admission
//! - Object notifications over channels
//! - Persistence hooks and a collection wrapper
//!
//! ## Usage
//!
//! ```
//! use recordkit_core::{IntegerBounds, ModificationState, NoopHooks, PersistedObject};
//!
//! let person = PersistedObject::new(NoopHooks);
//! person.add_rule("Age", IntegerBounds::new(0, 150));
//! person.set_property("Age", 40).unwrap();
//! person.save().unwrap();
//!
//! let txn = person.begin_transaction().unwrap();
//! person.set_property_in(&txn, "Age", 41).unwrap();
//! assert!(person.set_property_in(&txn, "Age", 400).is_err());
//!
//! // The failed write rolled the transaction back.
//! assert_eq!(person.get_property::<i64>("Age").unwrap(), 40);
//! assert_eq!(person.state(), ModificationState::Unmodified);
//! person.end_transaction(&txn).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod error;
mod events;
mod hooks;
mod object;
mod property;
mod state;
mod transaction;
mod types;
mod validation;

pub use collection::PersistedCollection;
pub use config::{ObjectConfig, ValidationMode};
pub use error::{CoreError, CoreResult, PropertyViolation, ValidationFailure};
pub use events::{EventFeed, EventKind, ObjectEvent};
pub use hooks::{BackendHooks, NoopHooks, PersistenceHooks};
pub use object::PersistedObject;
pub use property::PropertyStore;
pub use state::{ModificationState, StateMachine, TransitionTable};
pub use transaction::{
    Admission, RestoreTarget, Transaction, TransactionData, TransactionLock, TransactionOutcome,
};
pub use types::{ObjectId, TransactionId};
pub use validation::{
    DateBounds, IntegerBounds, RuleFn, StringLength, ValidationRule, Validator, Verdict,
};

pub use recordkit_value::{Document, FromValue, Value};
