//! Build repository.

use crate::error::MetadataResult;
use crate::models::{ArtifactRow, BuildRow};
use async_trait::async_trait;
use depot_core::{ArtifactKind, Build};

/// Repository for build operations.
#[async_trait]
pub trait BuildRepo: Send + Sync {
    /// Insert or update a build. `created_at` is only written on first insert.
    async fn upsert_build(&self, build: &BuildRow) -> MetadataResult<()>;

    /// Upsert a build and its artifacts atomically.
    async fn ingest_build(&self, build: &BuildRow, artifacts: &[ArtifactRow])
    -> MetadataResult<()>;

    /// Get a build with its artifacts.
    async fn get_build(&self, build_id: &str) -> MetadataResult<Option<Build>>;

    /// Load up to `limit` builds with their artifacts (one level deep).
    ///
    /// With `kind` set, only builds owning at least one artifact of that kind
    /// are returned. The artifact collections are NOT narrowed: a matching
    /// build comes back with all of its artifacts.
    async fn find_builds(&self, kind: Option<ArtifactKind>, limit: u32)
    -> MetadataResult<Vec<Build>>;

    /// Count builds.
    async fn count_builds(&self) -> MetadataResult<u64>;
}
