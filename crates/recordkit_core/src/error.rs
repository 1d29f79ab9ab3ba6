//! Error types for recordkit core.

use crate::state::ModificationState;
use crate::types::TransactionId;
use recordkit_value::Value;
use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in recordkit core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// One or more validation rules rejected a value.
    #[error("{0}")]
    ValidationFailed(ValidationFailure),

    /// The modification state machine does not allow this edge.
    #[error("illegal state transition from {from} to {to}")]
    IllegalTransition {
        /// State before the attempted transition.
        from: ModificationState,
        /// Requested target state.
        to: ModificationState,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The transaction is already enlisted in this object.
    #[error("transaction {id} is already active on this object")]
    TransactionAlreadyActive {
        /// The duplicate transaction.
        id: TransactionId,
    },

    /// The transaction completed while it was waiting for the object lock.
    #[error("transaction {id} completed before it was admitted")]
    TransactionCompleted {
        /// The completed transaction.
        id: TransactionId,
    },

    /// Writing a backed-up value back during rollback failed.
    #[error("undo of property '{property}' failed: {source}")]
    UndoFailed {
        /// Property being restored.
        property: String,
        /// Why the restore write was rejected.
        source: Box<CoreError>,
    },

    /// A persistence hook failed.
    #[error("persistence failed: {0}")]
    PersistenceFailed(#[from] recordkit_storage::StorageError),

    /// A stored value could not be converted.
    #[error("value error: {0}")]
    Value(#[from] recordkit_value::CodecError),
}

impl CoreError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an undo failed error.
    pub fn undo_failed(property: impl Into<String>, source: CoreError) -> Self {
        Self::UndoFailed {
            property: property.into(),
            source: Box::new(source),
        }
    }

    /// Returns the validation failure if this is a `ValidationFailed` error.
    #[must_use]
    pub fn validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::ValidationFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A rejected value for one property and every message its rules produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyViolation {
    /// Property that was written.
    pub property: String,
    /// Value that was rejected.
    pub value: Value,
    /// Messages from each failing rule, in rule order.
    pub messages: Vec<String>,
}

impl PropertyViolation {
    /// Creates a violation record.
    pub fn new(property: impl Into<String>, value: Value, messages: Vec<String>) -> Self {
        Self {
            property: property.into(),
            value,
            messages,
        }
    }
}

impl fmt::Display for PropertyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "New value '{}' for property '{}' violates rules: ",
            self.value, self.property
        )?;
        for message in &self.messages {
            write!(f, "\n - {message}")?;
        }
        Ok(())
    }
}

/// Aggregated validation failure, one entry per violating property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    violations: Vec<PropertyViolation>,
}

impl ValidationFailure {
    /// Creates a failure for a single property.
    #[must_use]
    pub fn single(violation: PropertyViolation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    /// Creates a failure from several violations.
    #[must_use]
    pub fn from_violations(violations: Vec<PropertyViolation>) -> Self {
        Self { violations }
    }

    /// The violations, in the order they were recorded.
    #[must_use]
    pub fn violations(&self) -> &[PropertyViolation] {
        &self.violations
    }

    /// Every rule message across all violations.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.violations
            .iter()
            .flat_map(|v| v.messages.iter().map(String::as_str))
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl From<ValidationFailure> for CoreError {
    fn from(failure: ValidationFailure) -> Self {
        Self::ValidationFailed(failure)
    }
}
