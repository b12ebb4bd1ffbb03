/// Errors from durable store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key is empty or contains characters the backend cannot map.
    #[error("invalid store key: {0:?}")]
    InvalidKey(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document exists but cannot be decoded.
    #[error("corrupt document {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
