//! Canonical CBOR encoder.

use crate::document::Document;
use crate::value::Value;
use chrono::SecondsFormat;

/// CBOR tag for an RFC 3339 date/time text string.
pub(crate) const TAG_DATETIME_TEXT: u64 = 0;

/// Encode a single value to canonical CBOR bytes.
///
/// Integers use the shortest possible encoding and timestamps are written as
/// tag 0 followed by RFC 3339 text with a `Z` suffix.
#[must_use]
pub fn value_to_cbor(value: &Value) -> Vec<u8> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode_value(value);
    encoder.into_bytes()
}

/// Encode a document to canonical CBOR bytes.
///
/// The document becomes a CBOR map whose text keys are sorted by their
/// encoded form (length-first, then bytewise), so identical documents always
/// produce identical bytes.
#[must_use]
pub fn document_to_cbor(document: &Document) -> Vec<u8> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode_document(document);
    encoder.into_bytes()
}

/// A canonical CBOR encoder.
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a value.
    pub fn encode_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.buffer.push(0xf6),
            Value::Bool(b) => self.buffer.push(if *b { 0xf5 } else { 0xf4 }),
            Value::Integer(n) => self.encode_integer(*n),
            Value::Text(s) => self.encode_text(s),
            Value::Bytes(b) => self.encode_bytes(b),
            Value::Timestamp(t) => {
                self.encode_unsigned(6, TAG_DATETIME_TEXT);
                self.encode_text(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true));
            }
        }
    }

    /// Encode a document as a canonical map.
    pub fn encode_document(&mut self, document: &Document) {
        let mut entries: Vec<(Vec<u8>, &Value)> = document
            .iter()
            .map(|(name, value)| {
                let mut key_encoder = CanonicalEncoder::new();
                key_encoder.encode_text(name);
                (key_encoder.into_bytes(), value)
            })
            .collect();

        entries.sort_by(|a, b| match a.0.len().cmp(&b.0.len()) {
            std::cmp::Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });

        self.encode_unsigned(5, entries.len() as u64);
        for (encoded_key, value) in entries {
            self.buffer.extend_from_slice(&encoded_key);
            self.encode_value(value);
        }
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.encode_unsigned(0, n as u64);
        } else {
            // CBOR negative integers encode -(n+1); safe for the whole i64 range
            let abs_minus_one = (-(n + 1)) as u64;
            self.encode_unsigned(1, abs_minus_one);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_unsigned(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        if value < 24 {
            self.buffer.push(mt | (value as u8));
        } else if u8::try_from(value).is_ok() {
            self.buffer.push(mt | 24);
            self.buffer.push(value as u8);
        } else if u16::try_from(value).is_ok() {
            self.buffer.push(mt | 25);
            self.buffer.extend_from_slice(&(value as u16).to_be_bytes());
        } else if u32::try_from(value).is_ok() {
            self.buffer.push(mt | 26);
            self.buffer.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&value.to_be_bytes());
        }
    }

    fn encode_bytes(&mut self, bytes: &[u8]) {
        self.encode_unsigned(2, bytes.len() as u64);
        self.buffer.extend_from_slice(bytes);
    }

    fn encode_text(&mut self, text: &str) {
        self.encode_unsigned(3, text.len() as u64);
        self.buffer.extend_from_slice(text.as_bytes());
    }
}

impl Default for CanonicalEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn encode_null_and_bool() {
        assert_eq!(value_to_cbor(&Value::Null), vec![0xf6]);
        assert_eq!(value_to_cbor(&Value::Bool(false)), vec![0xf4]);
        assert_eq!(value_to_cbor(&Value::Bool(true)), vec![0xf5]);
    }

    #[test]
    fn encode_integers_shortest_form() {
        assert_eq!(value_to_cbor(&Value::Integer(0)), vec![0x00]);
        assert_eq!(value_to_cbor(&Value::Integer(23)), vec![0x17]);
        assert_eq!(value_to_cbor(&Value::Integer(24)), vec![0x18, 24]);
        assert_eq!(value_to_cbor(&Value::Integer(256)), vec![0x19, 0x01, 0x00]);
        assert_eq!(value_to_cbor(&Value::Integer(-1)), vec![0x20]);
        assert_eq!(value_to_cbor(&Value::Integer(-100)), vec![0x38, 99]);
    }

    #[test]
    fn encode_text_and_bytes() {
        assert_eq!(value_to_cbor(&Value::from("a")), vec![0x61, b'a']);
        assert_eq!(value_to_cbor(&Value::Bytes(vec![1, 2])), vec![0x42, 1, 2]);
    }

    #[test]
    fn encode_timestamp_as_tag_zero() {
        let t = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
        let bytes = value_to_cbor(&Value::Timestamp(t));
        assert_eq!(bytes[0], 0xc0);
        assert_eq!(&bytes[2..], b"2021-06-01T12:00:00Z");
    }

    #[test]
    fn document_keys_sorted_length_first() {
        let mut doc = Document::new();
        doc.insert("bb", 1);
        doc.insert("a", 2);
        doc.insert("c", 3);
        let bytes = document_to_cbor(&doc);
        assert_eq!(
            bytes,
            vec![0xa3, 0x61, b'a', 0x02, 0x61, b'c', 0x03, 0x62, b'b', b'b', 0x01]
        );
    }
}
