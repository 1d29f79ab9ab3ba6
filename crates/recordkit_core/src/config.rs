//! Object configuration.

/// How a failing property write is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Reject the write with `ValidationFailed`.
    #[default]
    Immediate,
    /// Store the value, record the violation, and fail the next `save()`.
    Deferred,
}

/// Configuration for a persisted object.
#[derive(Debug, Clone)]
pub struct ObjectConfig {
    /// How validation failures are surfaced.
    pub validation_mode: ValidationMode,

    /// How many notifications the event feed keeps for polling.
    pub max_event_history: usize,

    /// Properties that public setters may not write.
    pub read_only: Vec<String>,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            validation_mode: ValidationMode::Immediate,
            max_event_history: 1024,
            read_only: Vec::new(),
        }
    }
}

impl ObjectConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the validation mode.
    #[must_use]
    pub const fn validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation_mode = mode;
        self
    }

    /// Sets how many notifications are kept for polling.
    #[must_use]
    pub const fn max_event_history(mut self, len: usize) -> Self {
        self.max_event_history = len;
        self
    }

    /// Marks a property read-only.
    #[must_use]
    pub fn read_only_property(mut self, name: impl Into<String>) -> Self {
        self.read_only.push(name.into());
        self
    }

    /// Returns true if `name` was marked read-only.
    #[must_use]
    pub fn is_read_only(&self, name: &str) -> bool {
        self.read_only.iter().any(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ObjectConfig::default();
        assert_eq!(config.validation_mode, ValidationMode::Immediate);
        assert_eq!(config.max_event_history, 1024);
        assert!(config.read_only.is_empty());
    }

    #[test]
    fn builder_pattern() {
        let config = ObjectConfig::new()
            .validation_mode(ValidationMode::Deferred)
            .max_event_history(16)
            .read_only_property("Id");

        assert_eq!(config.validation_mode, ValidationMode::Deferred);
        assert_eq!(config.max_event_history, 16);
        assert!(config.is_read_only("Id"));
        assert!(!config.is_read_only("Name"));
    }
}
