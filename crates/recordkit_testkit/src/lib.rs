//! # recordkit testkit
//!
//! Test utilities for recordkit.
//!
//! This crate provides:
//! - A sample person record with the usual rules
//! - Recording persistence hooks with switchable failures
//! - Temporary file-backed stores
//! - Property-based test generators using proptest
//! - A concurrent admission harness for transaction locks
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use recordkit_testkit::prelude::*;
//!
//! init_tracing();
//! let person = person(NoopHooks);
//! person.set_property(NAME, "Bob").unwrap();
//! person.save().unwrap();
//! assert_eq!(person.state(), ModificationState::Unmodified);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::stress::*;
    pub use recordkit_core::{
        BackendHooks, CoreError, EventKind, ModificationState, NoopHooks, ObjectConfig,
        PersistedCollection, PersistedObject, Transaction, ValidationMode, Value,
    };
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use stress::*;
