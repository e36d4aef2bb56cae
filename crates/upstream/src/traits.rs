//! Build source abstraction and the records it yields.

use crate::error::UpstreamResult;
use async_trait::async_trait;
use bytes::Bytes;
use depot_core::{BuildState, Driver, entity_id};
use futures::Stream;
use std::pin::Pin;
use time::OffsetDateTime;

/// A boxed stream of bytes for streaming downloads.
pub type ByteStream = Pin<Box<dyn Stream<Item = UpstreamResult<Bytes>> + Send>>;

/// One build as reported by an upstream listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamBuild {
    /// Provider-scoped key (see [`UpstreamBuild::id`]).
    pub key: String,
    pub driver: Driver,
    pub state: BuildState,
    pub created_at: Option<OffsetDateTime>,
    pub started_at: Option<OffsetDateTime>,
    pub stopped_at: Option<OffsetDateTime>,
    pub project: Option<String>,
    pub branch: Option<String>,
    pub message: Option<String>,
    pub html_url: Option<String>,
}

impl UpstreamBuild {
    /// Canonical entity id.
    pub fn id(&self) -> String {
        entity_id(self.driver, &self.key)
    }

    /// Stop time if present, else start time.
    ///
    /// `None` means the build has not started and carries no signal yet.
    pub fn update_time(&self) -> Option<OffsetDateTime> {
        self.stopped_at.or(self.started_at)
    }

    /// Whether the build has reached a terminal state upstream.
    pub fn is_finished(&self) -> bool {
        self.stopped_at.is_some()
    }
}

/// One artifact attached to an upstream build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamArtifact {
    /// Provider-scoped key.
    pub key: String,
    pub local_path: String,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub download_url: String,
}

/// A paginated upstream build listing.
#[async_trait]
pub trait BuildSource: Send + Sync {
    /// Driver tag of the builds this source produces.
    fn driver(&self) -> Driver;

    /// List builds, newest first.
    async fn list_builds(&self, limit: u32, offset: u32) -> UpstreamResult<Vec<UpstreamBuild>>;

    /// List the artifacts of a build. Sources without artifact support return none.
    async fn list_artifacts(&self, _build: &UpstreamBuild) -> UpstreamResult<Vec<UpstreamArtifact>> {
        Ok(Vec::new())
    }
}
