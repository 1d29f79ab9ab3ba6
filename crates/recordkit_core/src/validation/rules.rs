//! Standard validation rules.

use super::ValidationRule;
use chrono::{DateTime, SecondsFormat, Utc};
use recordkit_value::Value;

fn wrong_kind(messages: &mut Vec<String>, expected: &str, value: &Value) -> bool {
    messages.push(format!(
        "Value of kind {} cannot be checked as {expected}.",
        value.kind()
    ));
    false
}

/// Inclusive bounds on an integer property.
///
/// Null passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerBounds {
    min: i64,
    max: i64,
}

impl IntegerBounds {
    /// Creates the rule.
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl ValidationRule for IntegerBounds {
    fn validate(&self, value: &Value, messages: &mut Vec<String>) -> bool {
        let n = match value {
            Value::Null => return true,
            Value::Integer(n) => *n,
            other => return wrong_kind(messages, "an integer", other),
        };

        let mut valid = true;
        if n > self.max {
            messages.push(format!(
                "Integer is larger than maximum value of {}.",
                self.max
            ));
            valid = false;
        }
        if n < self.min {
            messages.push(format!(
                "Integer is smaller than minimum value of {}.",
                self.min
            ));
            valid = false;
        }
        valid
    }
}

/// Inclusive bounds on the character length of a text property.
///
/// Null counts as empty: it always satisfies the maximum and fails the
/// minimum only when the minimum is above zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLength {
    min: usize,
    max: usize,
}

impl StringLength {
    /// Creates the rule.
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl ValidationRule for StringLength {
    fn validate(&self, value: &Value, messages: &mut Vec<String>) -> bool {
        let len = match value {
            Value::Null => 0,
            Value::Text(s) => s.chars().count(),
            other => return wrong_kind(messages, "a string", other),
        };

        let mut valid = true;
        if len > self.max {
            messages.push(format!(
                "String is longer than maximum length of {} chars.",
                self.max
            ));
            valid = false;
        }
        if len < self.min {
            messages.push(format!(
                "String is shorter than minimum length of {} chars.",
                self.min
            ));
            valid = false;
        }
        valid
    }
}

/// Inclusive bounds on a timestamp property.
///
/// Null passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    min: DateTime<Utc>,
    max: DateTime<Utc>,
}

impl DateBounds {
    /// Creates the rule.
    #[must_use]
    pub fn new(min: DateTime<Utc>, max: DateTime<Utc>) -> Self {
        Self { min, max }
    }
}

impl ValidationRule for DateBounds {
    fn validate(&self, value: &Value, messages: &mut Vec<String>) -> bool {
        let t = match value {
            Value::Null => return true,
            Value::Timestamp(t) => *t,
            other => return wrong_kind(messages, "a date", other),
        };

        let mut valid = true;
        if t > self.max {
            messages.push(format!(
                "Date is larger than maximum value of {}.",
                self.max.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            ));
            valid = false;
        }
        if t < self.min {
            messages.push(format!(
                "Date is smaller than minimum value of {}.",
                self.min.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            ));
            valid = false;
        }
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn check(rule: &impl ValidationRule, value: Value) -> (bool, Vec<String>) {
        let mut messages = Vec::new();
        let ok = rule.validate(&value, &mut messages);
        (ok, messages)
    }

    #[test]
    fn integer_bounds_inclusive() {
        let rule = IntegerBounds::new(0, 150);
        assert!(check(&rule, Value::Integer(0)).0);
        assert!(check(&rule, Value::Integer(150)).0);
        assert!(check(&rule, Value::Null).0);
    }

    #[test]
    fn integer_bounds_messages() {
        let rule = IntegerBounds::new(0, 150);
        assert_eq!(
            check(&rule, Value::Integer(151)),
            (
                false,
                vec!["Integer is larger than maximum value of 150.".to_string()]
            )
        );
        assert_eq!(
            check(&rule, Value::Integer(-1)),
            (
                false,
                vec!["Integer is smaller than minimum value of 0.".to_string()]
            )
        );
    }

    #[test]
    fn inverted_bounds_report_both() {
        let (ok, messages) = check(&IntegerBounds::new(10, 5), Value::Integer(7));
        assert!(!ok);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn string_length_counts_chars() {
        let rule = StringLength::new(0, 3);
        assert!(check(&rule, Value::from("äöü")).0);
        assert_eq!(
            check(&rule, Value::from("abcd")).1,
            vec!["String is longer than maximum length of 3 chars."]
        );
    }

    #[test]
    fn string_length_null_handling() {
        assert!(check(&StringLength::new(0, 3), Value::Null).0);
        assert_eq!(
            check(&StringLength::new(2, 3), Value::Null),
            (
                false,
                vec!["String is shorter than minimum length of 2 chars.".to_string()]
            )
        );
    }

    #[test]
    fn date_bounds() {
        let min = Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap();
        let max = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let rule = DateBounds::new(min, max);

        assert!(check(&rule, Value::from(min)).0);
        assert!(check(&rule, Value::Null).0);

        let late = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            check(&rule, Value::from(late)).1,
            vec!["Date is larger than maximum value of 2000-01-01T00:00:00Z."]
        );

        let early = Utc.with_ymd_and_hms(1800, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            check(&rule, Value::from(early)).1,
            vec!["Date is smaller than minimum value of 1900-01-01T00:00:00Z."]
        );
    }

    #[test]
    fn wrong_kind_fails_with_message() {
        let (ok, messages) = check(&IntegerBounds::new(0, 1), Value::from("one"));
        assert!(!ok);
        assert_eq!(
            messages,
            vec!["Value of kind text cannot be checked as an integer."]
        );
    }
}
