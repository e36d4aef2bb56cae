//! Buildkite v2 build and artifact listing, and artifact downloads.

use super::{http_client, join, parse_base_url, send_json, send_stream};
use crate::error::{UpstreamError, UpstreamResult};
use crate::traits::{BuildSource, ByteStream, UpstreamArtifact, UpstreamBuild};
use async_trait::async_trait;
use depot_core::config::BuildkiteConfig;
use depot_core::{BuildState, Driver};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

/// Buildkite API client.
#[derive(Clone)]
pub struct BuildkiteClient {
    http: reqwest::Client,
    base_url: Url,
    organization: String,
    token: String,
}

impl std::fmt::Debug for BuildkiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildkiteClient")
            .field("base_url", &self.base_url.as_str())
            .field("organization", &self.organization)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct BuildkitePipeline {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct BuildkiteBuild {
    number: u64,
    #[serde(default)]
    state: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    started_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    finished_at: Option<OffsetDateTime>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    web_url: Option<String>,
    pipeline: BuildkitePipeline,
}

impl From<BuildkiteBuild> for UpstreamBuild {
    fn from(b: BuildkiteBuild) -> Self {
        UpstreamBuild {
            key: format!("{}/{}", b.pipeline.slug, b.number),
            driver: Driver::Buildkite,
            state: b
                .state
                .as_deref()
                .map(BuildState::parse_lenient)
                .unwrap_or_default(),
            created_at: b.created_at,
            started_at: b.started_at,
            stopped_at: b.finished_at,
            project: Some(b.pipeline.slug),
            branch: b.branch,
            message: b.message,
            html_url: b.web_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BuildkiteArtifact {
    id: String,
    path: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
    #[serde(default)]
    mime_type: Option<String>,
    download_url: String,
}

impl BuildkiteClient {
    /// Create a client from configuration.
    pub fn new(config: &BuildkiteConfig, connect_timeout: Duration) -> UpstreamResult<Self> {
        if config.organization.is_empty() {
            return Err(UpstreamError::InvalidUrl(
                "buildkite organization must not be empty".to_string(),
            ));
        }
        Ok(Self {
            http: http_client(connect_timeout)?,
            base_url: parse_base_url(&config.base_url)?,
            organization: config.organization.clone(),
            token: config.token.clone(),
        })
    }

    /// Stream an artifact's content.
    ///
    /// The API answers with a redirect to short-lived storage, which the
    /// client follows.
    pub async fn download(&self, download_url: &str) -> UpstreamResult<ByteStream> {
        let url = Url::parse(download_url)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{download_url}: {e}")))?;
        send_stream(self.http.get(url).bearer_auth(&self.token)).await
    }
}

#[async_trait]
impl BuildSource for BuildkiteClient {
    fn driver(&self) -> Driver {
        Driver::Buildkite
    }

    async fn list_builds(&self, limit: u32, offset: u32) -> UpstreamResult<Vec<UpstreamBuild>> {
        let per_page = limit.max(1);
        let page = offset / per_page + 1;
        let url = join(
            &self.base_url,
            &format!("organizations/{}/builds", self.organization),
        )?;
        tracing::debug!(page, per_page, "Listing Buildkite builds");

        let builds: Vec<BuildkiteBuild> = send_json(
            self.http
                .get(url)
                .bearer_auth(&self.token)
                .query(&[("page", page), ("per_page", per_page)]),
        )
        .await?;

        Ok(builds.into_iter().map(UpstreamBuild::from).collect())
    }

    async fn list_artifacts(&self, build: &UpstreamBuild) -> UpstreamResult<Vec<UpstreamArtifact>> {
        let Some((pipeline, number)) = build.key.rsplit_once('/') else {
            return Err(UpstreamError::InvalidUrl(format!(
                "malformed buildkite build key: {}",
                build.key
            )));
        };
        let url = join(
            &self.base_url,
            &format!(
                "organizations/{}/pipelines/{pipeline}/builds/{number}/artifacts",
                self.organization
            ),
        )?;

        let artifacts: Vec<BuildkiteArtifact> =
            send_json(self.http.get(url).bearer_auth(&self.token)).await?;

        Ok(artifacts
            .into_iter()
            .filter(|a| a.state.as_deref().is_none_or(|s| s == "finished"))
            .map(|a| UpstreamArtifact {
                key: a.id,
                local_path: a.path,
                size: a.file_size,
                mime_type: a.mime_type.filter(|m| !m.is_empty()),
                download_url: a.download_url,
            })
            .collect())
    }
}
