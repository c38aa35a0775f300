//! KeyStore - durable string key-value storage
//!
//! A small, synchronous key-value store with string values. Callers decide
//! how values are encoded (JSON arrays, plain text). Two backends:
//!
//! - [`FileStore`] - one JSON object file per store directory, written
//!   atomically under an advisory lock
//! - [`MemoryStore`] - in-process map for tests and throwaway sessions
//!
//! Both accept an optional byte quota; writes that would exceed it fail with
//! [`KvError::QuotaExceeded`] and leave the previous value in place.
//!
//! [`SharedStore`] wraps either backend in a cloneable handle so several
//! owners can persist into the same store.
//!
//! # Example
//!
//! ```ignore
//! use keystore::{FileStore, KeyValueStore};
//!
//! let mut store = FileStore::open("~/.local/share/ixstudio/store")?;
//! store.set("general_feedback", "fewer puns")?;
//! assert_eq!(store.get("general_feedback")?.as_deref(), Some("fewer puns"));
//! ```

pub mod cli;
pub mod config;
mod error;
mod store;

pub use error::KvError;
pub use store::{FileStore, KeyValueStore, KvResult, MemoryStore, SharedStore};
