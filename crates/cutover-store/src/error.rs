//! Persistence error types

/// Errors raised by store implementations and the JSON codec
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying I/O failure (missing directory, quota, permissions)
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Value failed to encode or decode
    #[error("storage codec failed: {0}")]
    Codec(#[from] serde_json::Error),

    /// Key is not representable by this store
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}
