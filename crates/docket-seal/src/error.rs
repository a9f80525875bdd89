//! Error types for the seal module.

use thiserror::Error;

/// Errors that can occur while sealing or opening tokens.
#[derive(Debug, Error)]
pub enum SealError {
    /// Encryption failed.
    #[error("seal failed: {0}")]
    Seal(String),

    /// Decryption failed: wrong key, or the ciphertext was tampered with.
    #[error("open failed: {0}")]
    Open(String),

    /// The value could not be encoded or decoded as CBOR.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Token text is not valid hex.
    #[error("malformed token: {0}")]
    MalformedToken(#[from] hex::FromHexError),

    /// Key material has the wrong length.
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// Result type for seal operations.
pub type Result<T> = std::result::Result<T, SealError>;
