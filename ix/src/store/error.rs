//! Storage errors

use keystore::KvError;
use thiserror::Error;

/// Errors from durable session storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Kv(#[from] KvError),

    #[error("Stored data under '{key}' is unreadable: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

impl StoreError {
    /// True when the backing store ran out of space
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Kv(e) if e.is_quota())
    }
}
