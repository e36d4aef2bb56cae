//! Upstream and dispatch error types.

use depot_core::Driver;
use thiserror::Error;

/// Errors talking to an upstream CI or hosting backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),
}

/// Result type for upstream operations.
pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

/// Errors resolving or streaming an artifact download.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The artifact's driver tag has no download strategy.
    #[error("unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// The driver is known but its client is not configured.
    #[error("{0} backend is not configured")]
    BackendUnconfigured(Driver),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("upstream returned an empty body")]
    EmptyBody,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnsupportedDriver(_) => "unsupported_driver",
            Self::BackendUnconfigured(_) => "backend_unconfigured",
            Self::Upstream(_) => "upstream",
            Self::EmptyBody => "empty_body",
            Self::Io(_) => "io",
        }
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
