//! CircleCI v1.1 build listing.

use super::{http_client, join, parse_base_url, send_json};
use crate::error::UpstreamResult;
use crate::traits::{BuildSource, UpstreamBuild};
use async_trait::async_trait;
use depot_core::config::CircleciConfig;
use depot_core::{BuildState, Driver};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

/// CircleCI API client.
///
/// Artifacts are not listed: there is no download strategy for this driver.
#[derive(Clone)]
pub struct CircleciClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for CircleciClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleciClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RecentBuild {
    build_num: u64,
    username: String,
    reponame: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    queued_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    start_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    stop_time: Option<OffsetDateTime>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    build_url: Option<String>,
}

impl From<RecentBuild> for UpstreamBuild {
    fn from(b: RecentBuild) -> Self {
        UpstreamBuild {
            key: format!("{}/{}/{}", b.username, b.reponame, b.build_num),
            driver: Driver::Circleci,
            state: b
                .status
                .as_deref()
                .map(BuildState::parse_lenient)
                .unwrap_or_default(),
            created_at: b.queued_at,
            started_at: b.start_time,
            stopped_at: b.stop_time,
            project: Some(format!("{}/{}", b.username, b.reponame)),
            branch: b.branch,
            message: b.subject,
            html_url: b.build_url,
        }
    }
}

impl CircleciClient {
    /// Create a client from configuration.
    pub fn new(config: &CircleciConfig, connect_timeout: Duration) -> UpstreamResult<Self> {
        Ok(Self {
            http: http_client(connect_timeout)?,
            base_url: parse_base_url(&config.base_url)?,
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl BuildSource for CircleciClient {
    fn driver(&self) -> Driver {
        Driver::Circleci
    }

    async fn list_builds(&self, limit: u32, offset: u32) -> UpstreamResult<Vec<UpstreamBuild>> {
        let url = join(&self.base_url, "recent-builds")?;
        tracing::debug!(limit, offset, "Listing CircleCI builds");

        let builds: Vec<RecentBuild> = send_json(
            self.http
                .get(url)
                .header("Circle-Token", &self.token)
                .header(reqwest::header::ACCEPT, "application/json")
                .query(&[
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                    ("shallow", "true".to_string()),
                ]),
        )
        .await?;

        Ok(builds.into_iter().map(UpstreamBuild::from).collect())
    }
}
