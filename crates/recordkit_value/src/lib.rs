//! # recordkit value
//!
//! Property values, documents and their canonical CBOR form.
//!
//! Every property of a persisted record holds a [`Value`]. A record's full
//! set of properties travels to and from storage as a [`Document`], whose
//! canonical encoding guarantees identical documents produce identical bytes.
//!
//! ## Canonical CBOR Rules
//!
//! - Document keys are text, sorted length-first then bytewise
//! - Integers use shortest encoding
//! - No floats
//! - Strings must be UTF-8
//! - No indefinite-length items
//! - Timestamps are tag 0 wrapping RFC 3339 text
//!
//! ## Usage
//!
//! ```
//! use recordkit_value::{Document, Value};
//!
//! let mut doc = Document::new();
//! doc.insert("name", "Alice");
//! doc.insert("age", 30);
//!
//! let bytes = doc.encode();
//! let decoded = Document::decode(&bytes).unwrap();
//! assert_eq!(decoded.get("age"), Some(&Value::Integer(30)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod document;
mod encoder;
mod error;
mod value;

pub use decoder::{document_from_cbor, value_from_cbor, CanonicalDecoder};
pub use document::Document;
pub use encoder::{document_to_cbor, value_to_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::{FromValue, Value};

/// Timestamp type used by [`Value::Timestamp`].
pub type Timestamp = chrono::DateTime<chrono::Utc>;
