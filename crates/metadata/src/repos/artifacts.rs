//! Artifact repository.

use crate::error::MetadataResult;
use crate::models::ArtifactRow;
use async_trait::async_trait;
use depot_core::Artifact;

/// Repository for artifact operations.
#[async_trait]
pub trait ArtifactRepo: Send + Sync {
    /// Insert or update an artifact. The owning build must exist.
    async fn upsert_artifact(&self, artifact: &ArtifactRow) -> MetadataResult<()>;

    /// Get an artifact by id.
    async fn get_artifact(&self, artifact_id: &str) -> MetadataResult<Option<Artifact>>;

    /// List artifacts owned by a build.
    async fn list_artifacts_for_build(&self, build_id: &str) -> MetadataResult<Vec<Artifact>>;

    /// Count artifacts.
    async fn count_artifacts(&self) -> MetadataResult<u64>;
}
