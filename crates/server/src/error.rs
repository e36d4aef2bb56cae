//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use depot_upstream::DispatchError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Signature or path token rejected. Carries no detail on purpose.
    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] depot_metadata::MetadataError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("{0}")]
    Core(#[from] depot_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Internal(_) => "internal_error",
            Self::Metadata(depot_metadata::MetadataError::Timeout { .. }) => "metadata_timeout",
            Self::Metadata(_) => "metadata_error",
            Self::Dispatch(e) => match e {
                DispatchError::UnsupportedDriver(_) => "unsupported_driver",
                DispatchError::BackendUnconfigured(_) => "backend_unconfigured",
                DispatchError::Upstream(_) | DispatchError::EmptyBody => "upstream_error",
                DispatchError::Io(_) => "internal_error",
            },
            Self::Core(_) => "core_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) => match e {
                depot_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                depot_metadata::MetadataError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Dispatch(e) => match e {
                DispatchError::UnsupportedDriver(_) => StatusCode::NOT_IMPLEMENTED,
                DispatchError::BackendUnconfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
                DispatchError::Upstream(_) | DispatchError::EmptyBody => StatusCode::BAD_GATEWAY,
                DispatchError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(e) => match e {
                depot_core::Error::UnknownArtifactKind(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
