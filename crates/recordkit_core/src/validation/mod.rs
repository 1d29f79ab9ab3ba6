//! Property validation.
//!
//! A [`Validator`] holds two ordered rule lists per property name: standard
//! rules (reusable [`ValidationRule`] objects such as [`IntegerBounds`]) and
//! delegate rules (closures supplied by the record author). Every rule
//! registered for a property runs, in registration order, and all of their
//! messages are collected before a verdict is returned.

mod rules;

pub use rules::{DateBounds, IntegerBounds, StringLength};

use recordkit_value::Value;
use std::collections::HashMap;

/// A reusable validation rule.
pub trait ValidationRule: Send + Sync {
    /// Checks `value`, appending a message for each failed condition.
    ///
    /// Returns true if the value is acceptable.
    fn validate(&self, value: &Value, messages: &mut Vec<String>) -> bool;
}

/// Closure form of a validation rule.
pub type RuleFn = Box<dyn Fn(&Value, &mut Vec<String>) -> bool + Send + Sync>;

/// Outcome of validating one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// True if every rule accepted the value.
    pub valid: bool,
    /// Messages from every failing rule.
    pub messages: Vec<String>,
}

impl Verdict {
    /// A passing verdict with no messages.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            valid: true,
            messages: Vec::new(),
        }
    }
}

/// Per-property rule registry.
#[derive(Default)]
pub struct Validator {
    rules: HashMap<String, Vec<Box<dyn ValidationRule>>>,
    delegates: HashMap<String, Vec<RuleFn>>,
}

impl Validator {
    /// Creates a validator with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a standard rule for `property`.
    pub fn add_rule(&mut self, property: impl Into<String>, rule: impl ValidationRule + 'static) {
        self.rules
            .entry(property.into())
            .or_default()
            .push(Box::new(rule));
    }

    /// Adds a delegate rule for `property`.
    pub fn add_rule_fn<F>(&mut self, property: impl Into<String>, rule: F)
    where
        F: Fn(&Value, &mut Vec<String>) -> bool + Send + Sync + 'static,
    {
        self.delegates
            .entry(property.into())
            .or_default()
            .push(Box::new(rule));
    }

    /// Runs every rule registered for `property` against `value`.
    pub fn validate(&self, property: &str, value: &Value) -> Verdict {
        let mut verdict = Verdict::pass();

        if let Some(rules) = self.rules.get(property) {
            for rule in rules {
                if !rule.validate(value, &mut verdict.messages) {
                    verdict.valid = false;
                }
            }
        }

        if let Some(delegates) = self.delegates.get(property) {
            for rule in delegates {
                if !rule(value, &mut verdict.messages) {
                    verdict.valid = false;
                }
            }
        }

        verdict
    }

    /// Number of rules of either kind registered for `property`.
    #[must_use]
    pub fn rule_count(&self, property: &str) -> usize {
        self.rules.get(property).map_or(0, Vec::len)
            + self.delegates.get(property).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("delegates", &self.delegates.keys().collect::<Vec<_>>())
            .finish()
    }
}
