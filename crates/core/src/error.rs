//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    #[error("unknown artifact kind: {0}")]
    UnknownArtifactKind(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
