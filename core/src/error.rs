//! Error types for local persistence backends.

use thiserror::Error;

/// Errors raised by [`KeyValueStore`](crate::environment::KeyValueStore) backends
#[derive(Error, Debug)]
pub enum StorageError {
    /// The key contains characters the backend cannot address
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Underlying I/O failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded
    #[error("Failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    /// Backend-specific failure (poisoned lock, unavailable device, ...)
    #[error("Storage backend failure: {0}")]
    Backend(String),
}
