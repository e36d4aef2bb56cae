//! Artifact install manifests and downloads.
//!
//! Both resources are reachable two ways: through a URL signature
//! (`/api/...?signature=`) or through the path-token gate (`/auth/...`).
//! Access checks always run before the store is consulted.

use crate::auth::{require_gated, require_signature};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::query::{download_path, manifest_path};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use depot_core::{Artifact, ArtifactKind, Driver, InstallManifest};
use depot_metadata::repos::ArtifactRepo;
use depot_upstream::DispatchError;
use futures::StreamExt;
use serde::Deserialize;

/// Signature query parameter.
#[derive(Debug, Deserialize)]
pub struct SignatureParams {
    pub signature: Option<String>,
}

/// GET /api/artifact-manifest/{artifact_id}
pub async fn get_artifact_manifest(
    State(state): State<AppState>,
    Path(artifact_id): Path<String>,
    Query(params): Query<SignatureParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_signature(
        &state.signer,
        &manifest_path(&artifact_id),
        params.signature.as_deref(),
    )?;
    serve_manifest(&state, &artifact_id, &headers).await
}

/// GET /auth/artifact-manifest/{token}/{*artifact_id}
pub async fn get_gated_artifact_manifest(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Response> {
    let artifact_id = require_gated(&req)?.rest.clone();
    serve_manifest(&state, &artifact_id, req.headers()).await
}

/// GET /api/artifact-download/{artifact_id}
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(artifact_id): Path<String>,
    Query(params): Query<SignatureParams>,
) -> ApiResult<Response> {
    require_signature(
        &state.signer,
        &download_path(&artifact_id),
        params.signature.as_deref(),
    )?;
    serve_download(&state, &artifact_id).await
}

/// GET /auth/artifact-download/{token}/{*artifact_id}
pub async fn download_gated_artifact(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Response> {
    let artifact_id = require_gated(&req)?.rest.clone();
    serve_download(&state, &artifact_id).await
}

async fn load_artifact(state: &AppState, artifact_id: &str) -> ApiResult<Artifact> {
    state
        .metadata
        .get_artifact(artifact_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("artifact not found: {artifact_id}")))
}

async fn serve_manifest(
    state: &AppState,
    artifact_id: &str,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    let artifact = load_artifact(state, artifact_id).await?;
    if artifact.kind != ArtifactKind::Ipa {
        return Err(ApiError::BadRequest(
            "install manifests are only available for ipa artifacts".to_string(),
        ));
    }

    // Sign the path, then make it absolute.
    let signed = state.signer.sign_path("GET", &download_path(&artifact.id));
    let package_url = format!("{}{signed}", base_url(state, headers)?);
    let plist = InstallManifest::new(&state.config.manifest, package_url).to_plist()?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "application/x-plist")],
        plist,
    )
        .into_response())
}

/// External base URL: configured, or derived from the forwarded request.
fn base_url(state: &AppState, headers: &HeaderMap) -> ApiResult<String> {
    if let Some(public_url) = &state.config.server.public_url {
        return Ok(public_url.trim_end_matches('/').to_string());
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing Host header".to_string()))?;

    Ok(format!("{scheme}://{host}"))
}

async fn serve_download(state: &AppState, artifact_id: &str) -> ApiResult<Response> {
    let artifact = load_artifact(state, artifact_id).await?;
    let driver_label = Driver::parse(&artifact.driver)
        .map(|d| d.as_str())
        .unwrap_or("unknown");

    let download = match state.dispatcher.open(&artifact).await {
        Ok(download) => download,
        Err(e) => {
            match &e {
                DispatchError::UnsupportedDriver(driver) => {
                    tracing::info!(artifact_id, driver = %driver, "Download requested for unsupported driver");
                }
                DispatchError::BackendUnconfigured(driver) => {
                    tracing::warn!(artifact_id, driver = %driver, "Download backend is not configured");
                }
                _ => {
                    tracing::error!(artifact_id, driver = driver_label, error = %e, "Artifact download failed");
                }
            }
            metrics::record_download(driver_label, e.label());
            return Err(e.into());
        }
    };
    metrics::record_download(driver_label, "ok");

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_DISPOSITION, &download.metadata.content_disposition);
    if let Some(len) = download.metadata.content_length {
        builder = builder.header(CONTENT_LENGTH, len);
    }
    if let Some(content_type) = &download.metadata.content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }

    let id = artifact.id.clone();
    let stream = download.body.map(move |chunk| {
        chunk.map_err(|e| {
            tracing::warn!(artifact_id = %id, error = %e, "Artifact streaming failed mid-transfer");
            std::io::Error::other(e)
        })
    });

    builder
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(format!("failed to build response: {e}")))
}
