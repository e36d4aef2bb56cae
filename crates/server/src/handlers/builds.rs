//! Build list endpoint.

use crate::error::ApiResult;
use crate::query::{self, BuildQuery, BuildView};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use depot_core::ArtifactKind;
use depot_metadata::StoreStats;
use serde::{Deserialize, Serialize};

/// Query parameters for GET /api/build-list.
#[derive(Debug, Default, Deserialize)]
pub struct BuildListParams {
    /// Kind name or numeric code; `0`/`unknown` disables the filter.
    pub artifact_kind: Option<String>,
    #[serde(default)]
    pub with_stats: bool,
}

/// Build list response.
#[derive(Debug, Serialize)]
pub struct BuildListResponse {
    pub builds: Vec<BuildView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_stats: Option<StoreStats>,
}

/// GET /api/build-list
pub async fn list_builds(
    State(state): State<AppState>,
    Query(params): Query<BuildListParams>,
) -> ApiResult<Json<BuildListResponse>> {
    let kind = params
        .artifact_kind
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(ArtifactKind::parse)
        .transpose()?;

    let query = BuildQuery {
        kind,
        limit: state.config.server.query_limit,
    };
    let builds = query::list_builds(state.metadata.as_ref(), &state.signer, query).await?;

    let store_stats = if params.with_stats {
        Some(state.metadata.stats().await?)
    } else {
        None
    };

    Ok(Json(BuildListResponse {
        builds,
        store_stats,
    }))
}
