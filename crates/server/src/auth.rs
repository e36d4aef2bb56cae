//! Request tracing and signature checks.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use depot_core::config::AuthConfig;
use depot_signer::{Salt, SignerResult, UrlSigner};
use percent_encoding::percent_decode_str;
use regex_lite::Regex;
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value.
    /// The value is truncated to MAX_TRACE_ID_LEN characters and non-printable characters removed.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    /// Get the trace ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Run each request inside a span carrying its trace ID.
pub async fn trace_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    let span = tracing::info_span!("request", trace_id = %trace_id);
    req.extensions_mut().insert(trace_id);
    next.run(req).instrument(span).await
}

/// Salt from `auth.salt` or `auth.salt_file`; `None` when neither is set.
pub fn configured_salt(config: &AuthConfig) -> SignerResult<Option<Salt>> {
    if let Some(secret) = &config.salt {
        return Salt::new(secret).map(Some);
    }
    match &config.salt_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading salt from file");
            Salt::from_file(path).map(Some)
        }
        None => Ok(None),
    }
}

/// Path-scoped bearer gate.
///
/// Each pattern must define `token` and `rest` capture groups. A request
/// whose path matches is let through only if `token` is the path token of
/// `rest`.
#[derive(Debug)]
pub struct PathGate {
    patterns: Vec<Regex>,
}

/// Remainder of a path that passed the gate, percent-decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatedPath {
    pub rest: String,
}

impl PathGate {
    /// Compile the configured patterns.
    pub fn new(patterns: &[String]) -> depot_core::Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let regex = Regex::new(pattern).map_err(|e| {
                    depot_core::Error::Config(format!("invalid gate pattern {pattern:?}: {e}"))
                })?;
                let names: Vec<_> = regex.capture_names().flatten().collect();
                if !names.contains(&"token") || !names.contains(&"rest") {
                    return Err(depot_core::Error::Config(format!(
                        "gate pattern {pattern:?} must capture `token` and `rest`"
                    )));
                }
                Ok(regex)
            })
            .collect::<depot_core::Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Check a request path.
    ///
    /// `None` means no pattern applies; `Some(Err)` means a pattern applies and
    /// the token is wrong.
    pub fn check(&self, path: &str, signer: &UrlSigner) -> Option<ApiResult<GatedPath>> {
        let captures = self.patterns.iter().find_map(|p| p.captures(path))?;
        let (Some(token), Some(rest)) = (captures.name("token"), captures.name("rest")) else {
            return Some(Err(ApiError::Unauthorized));
        };

        if !signer.verify_path_token(rest.as_str(), token.as_str()) {
            return Some(Err(ApiError::Unauthorized));
        }

        Some(
            percent_decode_str(rest.as_str())
                .decode_utf8()
                .map(|rest| GatedPath {
                    rest: rest.into_owned(),
                })
                .map_err(|_| ApiError::BadRequest("path is not valid UTF-8".to_string())),
        )
    }
}

/// Build a gated path: `{prefix}/{token}/{rest}`.
pub fn gated_path(signer: &UrlSigner, prefix: &str, rest: &str) -> String {
    format!("{prefix}/{}/{rest}", signer.path_token(rest))
}

/// Enforce the path gate and record the verified remainder.
pub async fn gate_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match state.gate.check(req.uri().path(), &state.signer) {
        None => next.run(req).await,
        Some(Ok(gated)) => {
            req.extensions_mut().insert(gated);
            next.run(req).await
        }
        Some(Err(e)) => {
            if matches!(e, ApiError::Unauthorized) {
                metrics::record_signature_rejection("path_token");
                tracing::debug!(path = %req.uri().path(), "Path token rejected");
            }
            e.into_response()
        }
    }
}

/// Require that the gate verified this request.
pub fn require_gated(req: &Request) -> ApiResult<&GatedPath> {
    req.extensions()
        .get::<GatedPath>()
        .ok_or(ApiError::Unauthorized)
}

/// Require a valid URL signature for `path`.
///
/// Missing and wrong signatures are indistinguishable to the caller.
pub fn require_signature(signer: &UrlSigner, path: &str, signature: Option<&str>) -> ApiResult<()> {
    match signature {
        Some(signature) if signer.verify("GET", path, signature) => Ok(()),
        _ => {
            metrics::record_signature_rejection("url");
            Err(ApiError::Unauthorized)
        }
    }
}
