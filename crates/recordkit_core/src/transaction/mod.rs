//! Transactions over persisted objects.
//!
//! recordkit transactions group property edits so they can be committed or
//! rolled back as a unit:
//! - **Handle**: [`Transaction`] is passed explicitly to every call that
//!   participates; completing it commits or rolls back every enlisted object
//! - **Memento**: [`TransactionData`] keeps the first prior value of each
//!   written property
//! - **Admission**: [`TransactionLock`] lets one transaction at a time hold an
//!   object and admits waiters in arrival order

mod data;
mod handle;
mod lock;

pub use data::{RestoreTarget, TransactionData};
pub use handle::{Transaction, TransactionOutcome};
pub use lock::{Admission, TransactionLock};
