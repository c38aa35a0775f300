//! KeyStore error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during key-value operations
#[derive(Debug, Error)]
pub enum KvError {
    #[error("Quota exceeded: writing {key} needs {needed} bytes, quota is {quota}")]
    QuotaExceeded { key: String, needed: usize, quota: usize },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KvError {
    /// Check if this is a quota error
    pub fn is_quota(&self) -> bool {
        matches!(self, KvError::QuotaExceeded { .. })
    }

    /// Check if the backing file could not be parsed
    pub fn is_corrupt(&self) -> bool {
        matches!(self, KvError::Corrupt { .. })
    }
}
