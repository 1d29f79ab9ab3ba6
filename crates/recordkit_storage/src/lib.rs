//! # recordkit storage
//!
//! Keyed storage backends for recordkit persistence adapters.
//!
//! Storage backends are **opaque keyed byte stores** - they do not interpret
//! the bytes they hold. The core crate encodes record documents and decides
//! which key a record lives under.
//!
//! ## Design Principles
//!
//! - Backends are simple key/value stores (insert, update, read, remove)
//! - `insert` never overwrites and `update` never creates
//! - Must be `Send + Sync` so several records can share one backend
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - One file per key inside a locked directory
//!
//! ## Example
//!
//! ```rust
//! use recordkit_storage::{StorageBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.insert("alice", b"hello world").unwrap();
//! assert_eq!(backend.read("alice").unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{validate_key, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
