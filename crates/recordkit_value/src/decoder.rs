//! Canonical CBOR decoder.

use crate::document::Document;
use crate::encoder::TAG_DATETIME_TEXT;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use chrono::{DateTime, Utc};

/// Decode a single value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid canonical CBOR, contain
/// forbidden constructs (floats, indefinite lengths), a container, or
/// trailing bytes.
pub fn value_from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = CanonicalDecoder::new(bytes);
    let value = decoder.decode_value()?;
    decoder.ensure_consumed()?;
    Ok(value)
}

/// Decode a document from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not a canonical map of text keys to
/// values.
pub fn document_from_cbor(bytes: &[u8]) -> CodecResult<Document> {
    let mut decoder = CanonicalDecoder::new(bytes);
    let document = decoder.decode_document()?;
    decoder.ensure_consumed()?;
    Ok(document)
}

/// A canonical CBOR decoder.
///
/// This decoder validates that input follows canonical CBOR rules
/// and rejects forbidden constructs.
pub struct CanonicalDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

/// Maximum allowed entry count for a document map.
const MAX_DOCUMENT_ENTRIES: u64 = 1024 * 1024;

/// Maximum allowed byte/string length.
const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

impl<'a> CanonicalDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next scalar value.
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode_value(&mut self) -> CodecResult<Value> {
        let initial_byte = self.read_byte()?;
        let major_type = initial_byte >> 5;
        let additional_info = initial_byte & 0x1f;

        match major_type {
            0 => {
                let n = self.decode_unsigned(additional_info)?;
                i64::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| CodecError::invalid_structure("integer exceeds i64"))
            }
            1 => {
                let n = self.decode_unsigned(additional_info)?;
                if i64::try_from(n).is_ok() {
                    Ok(Value::Integer(-(n as i64) - 1))
                } else {
                    Err(CodecError::invalid_structure("integer exceeds i64"))
                }
            }
            2 => self.decode_bytes(additional_info).map(Value::Bytes),
            3 => self.decode_text(additional_info).map(Value::Text),
            4 | 5 => Err(CodecError::unsupported_type("nested container")),
            6 => self.decode_tagged(additional_info),
            7 => self.decode_simple(additional_info),
            _ => Err(CodecError::invalid_structure("invalid major type")),
        }
    }

    /// Decode a document map.
    pub fn decode_document(&mut self) -> CodecResult<Document> {
        let initial_byte = self.read_byte()?;
        if initial_byte >> 5 != 5 {
            return Err(CodecError::invalid_structure("document must be a map"));
        }
        let additional_info = initial_byte & 0x1f;
        if additional_info == 31 {
            return Err(CodecError::IndefiniteLengthForbidden);
        }
        let len = self.decode_unsigned(additional_info)?;
        if len > MAX_DOCUMENT_ENTRIES {
            return Err(CodecError::SizeLimitExceeded {
                claimed: len,
                max_allowed: MAX_DOCUMENT_ENTRIES,
            });
        }

        let mut document = Document::new();
        let mut prev_key_bytes: Option<&[u8]> = None;

        for _ in 0..len {
            let key_start = self.pos;
            let key_byte = self.read_byte()?;
            if key_byte >> 5 != 3 {
                return Err(CodecError::invalid_structure("document keys must be text"));
            }
            let key = self.decode_text(key_byte & 0x1f)?;
            let key_bytes = &self.data[key_start..self.pos];

            if let Some(prev) = prev_key_bytes {
                if compare_cbor_bytes(prev, key_bytes) != std::cmp::Ordering::Less {
                    return Err(CodecError::invalid_structure(
                        "non-canonical: map keys not in sorted order",
                    ));
                }
            }
            prev_key_bytes = Some(key_bytes);

            let value = self.decode_value()?;
            document.insert(key, value);
        }

        Ok(document)
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    fn ensure_consumed(&self) -> CodecResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CodecError::invalid_structure(format!(
                "{} trailing bytes",
                self.remaining().len()
            )))
        }
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        if self.pos >= self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.pos + len > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    #[inline]
    fn decode_unsigned(&mut self, additional_info: u8) -> CodecResult<u64> {
        match additional_info {
            0..=23 => Ok(u64::from(additional_info)),
            24 => {
                let byte = self.read_byte()?;
                if byte < 24 {
                    return Err(non_canonical());
                }
                Ok(u64::from(byte))
            }
            25 => {
                let bytes = self.read_bytes(2)?;
                let value = u16::from_be_bytes([bytes[0], bytes[1]]);
                if u8::try_from(value).is_ok() {
                    return Err(non_canonical());
                }
                Ok(u64::from(value))
            }
            26 => {
                let bytes = self.read_bytes(4)?;
                let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                if u16::try_from(value).is_ok() {
                    return Err(non_canonical());
                }
                Ok(u64::from(value))
            }
            27 => {
                let bytes = self.read_bytes(8)?;
                let value = u64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]);
                if u32::try_from(value).is_ok() {
                    return Err(non_canonical());
                }
                Ok(value)
            }
            28..=30 => Err(CodecError::invalid_structure("reserved additional info")),
            _ => Err(CodecError::IndefiniteLengthForbidden),
        }
    }

    fn decode_length(&mut self, additional_info: u8) -> CodecResult<usize> {
        if additional_info == 31 {
            return Err(CodecError::IndefiniteLengthForbidden);
        }
        let len = self.decode_unsigned(additional_info)?;
        if len > MAX_BYTES_LENGTH {
            return Err(CodecError::SizeLimitExceeded {
                claimed: len,
                max_allowed: MAX_BYTES_LENGTH,
            });
        }
        usize::try_from(len).map_err(|_| CodecError::invalid_structure("length exceeds usize"))
    }

    fn decode_bytes(&mut self, additional_info: u8) -> CodecResult<Vec<u8>> {
        let len = self.decode_length(additional_info)?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    fn decode_text(&mut self, additional_info: u8) -> CodecResult<String> {
        let len = self.decode_length(additional_info)?;
        let bytes = self.read_bytes(len)?;
        let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(text.to_string())
    }

    fn decode_tagged(&mut self, additional_info: u8) -> CodecResult<Value> {
        let tag = self.decode_unsigned(additional_info)?;
        if tag != TAG_DATETIME_TEXT {
            return Err(CodecError::unsupported_type(format!("tag {tag}")));
        }
        let initial_byte = self.read_byte()?;
        if initial_byte >> 5 != 3 {
            return Err(CodecError::invalid_structure("tag 0 must wrap a text string"));
        }
        let text = self.decode_text(initial_byte & 0x1f)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
            .map_err(|e| CodecError::decoding_failed(format!("invalid timestamp '{text}': {e}")))
    }

    fn decode_simple(&mut self, additional_info: u8) -> CodecResult<Value> {
        match additional_info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 | 23 => Ok(Value::Null),
            24 => {
                let simple = self.read_byte()?;
                match simple {
                    0..=31 => Err(CodecError::invalid_structure(
                        "non-canonical: simple value should use direct encoding",
                    )),
                    _ => Err(CodecError::unsupported_type(format!(
                        "simple value {simple}"
                    ))),
                }
            }
            25..=27 => Err(CodecError::FloatForbidden),
            28..=30 => Err(CodecError::invalid_structure("reserved additional info")),
            31 => Err(CodecError::invalid_structure("break without indefinite")),
            _ => Err(CodecError::unsupported_type(format!(
                "simple value {additional_info}"
            ))),
        }
    }
}

fn non_canonical() -> CodecError {
    CodecError::invalid_structure("non-canonical: value could be encoded in fewer bytes")
}

/// Compare two CBOR byte sequences for canonical ordering.
/// Uses length-first, then bytewise comparison.
fn compare_cbor_bytes(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    match a.len().cmp(&b.len()) {
        std::cmp::Ordering::Equal => a.cmp(b),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{document_to_cbor, value_to_cbor};
    use chrono::TimeZone;

    #[test]
    fn decode_scalars() {
        assert_eq!(value_from_cbor(&[0xf6]).unwrap(), Value::Null);
        assert_eq!(value_from_cbor(&[0xf5]).unwrap(), Value::Bool(true));
        assert_eq!(value_from_cbor(&[0x18, 24]).unwrap(), Value::Integer(24));
        assert_eq!(value_from_cbor(&[0x38, 99]).unwrap(), Value::Integer(-100));
        assert_eq!(
            value_from_cbor(&[0x43, 1, 2, 3]).unwrap(),
            Value::Bytes(vec![1, 2, 3])
        );
    }

    #[test]
    fn decode_timestamp() {
        let t = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        let bytes = value_to_cbor(&Value::Timestamp(t));
        assert_eq!(value_from_cbor(&bytes).unwrap(), Value::Timestamp(t));
    }

    #[test]
    fn reject_non_canonical_integer() {
        assert!(matches!(
            value_from_cbor(&[0x18, 5]),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn reject_float() {
        assert!(matches!(
            value_from_cbor(&[0xf9, 0x00, 0x00]),
            Err(CodecError::FloatForbidden)
        ));
    }

    #[test]
    fn reject_indefinite_text() {
        assert!(matches!(
            value_from_cbor(&[0x7f, 0x61, b'a', 0xff]),
            Err(CodecError::IndefiniteLengthForbidden)
        ));
    }

    #[test]
    fn reject_trailing_bytes() {
        assert!(value_from_cbor(&[0x01, 0x02]).is_err());
    }

    #[test]
    fn reject_nested_container_value() {
        assert!(matches!(
            value_from_cbor(&[0x80]),
            Err(CodecError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn document_decodes_encoded_form() {
        let mut doc = Document::new();
        doc.insert("name", "Bob");
        doc.insert("age", 42);
        doc.insert("active", true);
        let bytes = document_to_cbor(&doc);
        assert_eq!(document_from_cbor(&bytes).unwrap(), doc);
    }

    #[test]
    fn document_rejects_unsorted_keys() {
        // {"bb": 1, "a": 2}
        let bytes = [0xa2, 0x62, b'b', b'b', 0x01, 0x61, b'a', 0x02];
        assert!(matches!(
            document_from_cbor(&bytes),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn document_rejects_non_text_keys() {
        let bytes = [0xa1, 0x01, 0x02];
        assert!(document_from_cbor(&bytes).is_err());
    }

    #[test]
    fn document_must_be_map() {
        assert!(document_from_cbor(&[0x01]).is_err());
    }
}
