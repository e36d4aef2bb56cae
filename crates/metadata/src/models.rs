//! Database models mapping to the entity schema.

use crate::error::{MetadataError, MetadataResult};
use depot_core::{Artifact, ArtifactKind, Build, BuildState, Driver};
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

// =============================================================================
// Builds
// =============================================================================

/// Build record.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BuildRow {
    pub build_id: String,
    pub driver: String,
    pub state: String,
    /// Written once; later upserts keep the stored value.
    pub created_at: Option<OffsetDateTime>,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
    pub project: Option<String>,
    pub branch: Option<String>,
    pub message: Option<String>,
    pub html_url: Option<String>,
    pub updated_at: OffsetDateTime,
}

impl BuildRow {
    /// Convert into the domain type with its (already loaded) artifacts.
    pub fn into_build(self, artifacts: Vec<Artifact>) -> MetadataResult<Build> {
        let driver = Driver::parse(&self.driver).map_err(|e| {
            MetadataError::Internal(format!("build {} has {e}", self.build_id))
        })?;
        Ok(Build {
            id: self.build_id,
            driver,
            state: BuildState::parse_lenient(&self.state),
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            project: self.project,
            branch: self.branch,
            message: self.message,
            html_url: self.html_url,
            artifacts,
        })
    }
}

// =============================================================================
// Artifacts
// =============================================================================

/// Artifact record.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ArtifactRow {
    pub artifact_id: String,
    pub build_id: String,
    pub kind: i64,
    pub driver: String,
    pub download_url: String,
    pub local_path: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<ArtifactRow> for Artifact {
    fn from(row: ArtifactRow) -> Self {
        Artifact {
            id: row.artifact_id,
            build_id: row.build_id,
            kind: ArtifactKind::from_code(row.kind),
            driver: row.driver,
            download_url: row.download_url,
            local_path: row.local_path,
            file_size: row.file_size.and_then(|size| u64::try_from(size).ok()),
            mime_type: row.mime_type.filter(|m| !m.is_empty()),
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Entity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub builds: u64,
    pub artifacts: u64,
}
