//! Property-based test generators using proptest.
//!
//! Provides strategies for generating property values, documents and
//! write sequences.

use crate::fixtures::{AGE, MAX_AGE, MAX_NAME_LEN, NAME};
use chrono::DateTime;
use proptest::prelude::*;
use recordkit_value::{Document, Value};

/// Seconds since the epoch of 1900-01-01 and 2100-01-01.
const MIN_SECONDS: i64 = -2_208_988_800;
const MAX_SECONDS: i64 = 4_102_444_800;

/// Strategy for timestamps between 1900 and 2100, whole seconds.
pub fn timestamp_strategy() -> impl Strategy<Value = Value> {
    (MIN_SECONDS..=MAX_SECONDS)
        .prop_filter_map("Timestamp out of range", |secs| {
            DateTime::from_timestamp(secs, 0).map(Value::Timestamp)
        })
}

/// Strategy for any property value.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        ".{0,32}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
        timestamp_strategy(),
    ]
}

/// Strategy for property names.
pub fn property_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,7}").expect("Invalid regex")
}

/// Strategy for documents of up to `max_len` properties.
pub fn document_strategy(max_len: usize) -> impl Strategy<Value = Document> {
    prop::collection::btree_map(property_name_strategy(), value_strategy(), 0..=max_len)
        .prop_map(|map| map.into_iter().collect())
}

/// Strategy for a sequence of writes over a handful of names, so the same
/// property is usually written more than once.
pub fn write_sequence_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["A", "B", "C", "D"]).prop_map(str::to_string),
            value_strategy(),
        ),
        1..32,
    )
}

/// Strategy for names the person rules accept.
pub fn valid_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[A-Za-z ]{{0,{MAX_NAME_LEN}}}")).expect("Invalid regex")
}

/// Strategy for ages the person rules accept.
pub fn valid_age_strategy() -> impl Strategy<Value = i64> {
    0..=MAX_AGE
}

/// Strategy for a person write that the rules reject.
pub fn invalid_person_write_strategy() -> impl Strategy<Value = (&'static str, Value)> {
    prop_oneof![
        (MAX_AGE + 1..i64::MAX).prop_map(|n| (AGE, Value::Integer(n))),
        (i64::MIN..0).prop_map(|n| (AGE, Value::Integer(n))),
        prop::string::string_regex(&format!("[a-z]{{{},40}}", MAX_NAME_LEN + 1))
            .expect("Invalid regex")
            .prop_map(|s| (NAME, Value::Text(s))),
    ]
}
