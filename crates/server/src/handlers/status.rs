//! Liveness and status endpoints.

use crate::state::AppState;
use crate::sync::SyncStatus;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Ping response. Intentionally empty.
#[derive(Debug, Serialize)]
pub struct PingResponse {}

/// GET /api/ping
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {})
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<u64>,
    /// Set instead of the counts when the store could not be queried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
    pub sync: Vec<SyncStatus>,
}

/// GET /api/status
///
/// Always answers 200; a store failure is reported in the body.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let mut sync = Vec::with_capacity(state.sync.len());
    for engine in state.sync.iter() {
        sync.push(engine.status().await);
    }

    let (builds, artifacts, store_error) = match state.metadata.stats().await {
        Ok(stats) => (Some(stats.builds), Some(stats.artifacts), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load store stats");
            (None, None, Some(e.to_string()))
        }
    };

    Json(StatusResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
        builds,
        artifacts,
        store_error,
        sync,
    })
}
