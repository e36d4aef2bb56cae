//! Build list queries and their response shapes.

use depot_core::{Artifact, ArtifactKind, Build, BuildState};
use depot_metadata::repos::BuildRepo;
use depot_metadata::{MetadataResult, MetadataStore};
use depot_signer::UrlSigner;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use std::cmp::Ordering;
use time::OffsetDateTime;

/// Characters escaped when an entity id is placed in a single path segment.
const ID_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b':');

/// Signed route prefix for artifact downloads.
pub const DOWNLOAD_PREFIX: &str = "/api/artifact-download";

/// Signed route prefix for install manifests.
pub const MANIFEST_PREFIX: &str = "/api/artifact-manifest";

/// Canonical (unsigned) download path for an artifact id.
pub fn download_path(artifact_id: &str) -> String {
    format!("{DOWNLOAD_PREFIX}/{}", utf8_percent_encode(artifact_id, ID_SEGMENT))
}

/// Canonical (unsigned) manifest path for an artifact id.
pub fn manifest_path(artifact_id: &str) -> String {
    format!("{MANIFEST_PREFIX}/{}", utf8_percent_encode(artifact_id, ID_SEGMENT))
}

/// Parameters of a build list query.
#[derive(Clone, Copy, Debug)]
pub struct BuildQuery {
    /// Only builds owning an artifact of this kind, and only those artifacts.
    pub kind: Option<ArtifactKind>,
    pub limit: u32,
}

/// Artifact as returned to clients. The upstream URL is never included.
#[derive(Debug, Serialize)]
pub struct ArtifactView {
    pub id: String,
    pub build_id: String,
    pub kind: ArtifactKind,
    pub driver: String,
    pub file_name: String,
    pub local_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Signed download path.
    pub signed_url: String,
    /// Signed install manifest path (IPA only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
}

impl ArtifactView {
    fn new(artifact: Artifact, signer: &UrlSigner) -> Self {
        let signed_url = signer.sign_path("GET", &download_path(&artifact.id));
        let manifest_url = (artifact.kind == ArtifactKind::Ipa)
            .then(|| signer.sign_path("GET", &manifest_path(&artifact.id)));
        Self {
            file_name: artifact.file_name().to_string(),
            id: artifact.id,
            build_id: artifact.build_id,
            kind: artifact.kind,
            driver: artifact.driver,
            local_path: artifact.local_path,
            file_size: artifact.file_size,
            mime_type: artifact.mime_type,
            created_at: artifact.created_at,
            signed_url,
            manifest_url,
        }
    }
}

/// Build as returned to clients.
#[derive(Debug, Serialize)]
pub struct BuildView {
    pub id: String,
    pub driver: &'static str,
    pub state: BuildState,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    pub project: Option<String>,
    pub branch: Option<String>,
    pub message: Option<String>,
    pub html_url: Option<String>,
    pub artifacts: Vec<ArtifactView>,
}

impl BuildView {
    fn new(build: Build, signer: &UrlSigner) -> Self {
        Self {
            id: build.id,
            driver: build.driver.as_str(),
            state: build.state,
            created_at: build.created_at,
            started_at: build.started_at,
            finished_at: build.finished_at,
            project: build.project,
            branch: build.branch,
            message: build.message,
            html_url: build.html_url,
            artifacts: build
                .artifacts
                .into_iter()
                .map(|artifact| ArtifactView::new(artifact, signer))
                .collect(),
        }
    }
}

/// List builds, newest first, with signed artifact URLs.
///
/// The store narrows builds to those owning a matching artifact but returns
/// their full artifact collections, so the collections are filtered again
/// here.
pub async fn list_builds(
    store: &dyn MetadataStore,
    signer: &UrlSigner,
    query: BuildQuery,
) -> MetadataResult<Vec<BuildView>> {
    let kind = query.kind.filter(|kind| *kind != ArtifactKind::Unknown);
    let mut builds = store.find_builds(kind, query.limit).await?;

    if let Some(kind) = kind {
        for build in &mut builds {
            build.artifacts.retain(|artifact| artifact.kind == kind);
        }
    }

    sort_builds(&mut builds);

    Ok(builds
        .into_iter()
        .map(|build| BuildView::new(build, signer))
        .collect())
}

/// Newest first; builds without a creation time come before all others.
pub fn sort_builds(builds: &mut [Build]) {
    builds.sort_by(|a, b| match (a.created_at, b.created_at) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => b.cmp(&a),
    });
}
