//! Signer error types.

use thiserror::Error;

/// Signing operation errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("invalid salt: {0}")]
    InvalidSalt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for signing operations.
pub type SignerResult<T> = std::result::Result<T, SignerError>;
