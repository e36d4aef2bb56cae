//! Scripted upstream build sources.

use async_trait::async_trait;
use depot_core::{BuildState, Driver};
use depot_upstream::{BuildSource, UpstreamArtifact, UpstreamBuild, UpstreamError, UpstreamResult};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use time::{Duration, OffsetDateTime};
use tokio::sync::Notify;

/// Base time for generated builds.
pub fn t0() -> OffsetDateTime {
    time::macros::datetime!(2024-06-01 00:00 UTC)
}

/// A finished build stopping `minutes` after [`t0`].
pub fn finished_build(number: u32, minutes: i64) -> UpstreamBuild {
    UpstreamBuild {
        key: format!("ios/{number}"),
        driver: Driver::Buildkite,
        state: BuildState::Passed,
        created_at: Some(t0() + Duration::minutes(minutes - 2)),
        started_at: Some(t0() + Duration::minutes(minutes - 1)),
        stopped_at: Some(t0() + Duration::minutes(minutes)),
        project: Some("ios".to_string()),
        branch: Some("main".to_string()),
        message: None,
        html_url: None,
    }
}

/// A build that has been queued but not started.
pub fn queued_build(number: u32) -> UpstreamBuild {
    UpstreamBuild {
        key: format!("ios/{number}"),
        driver: Driver::Buildkite,
        state: BuildState::Scheduled,
        created_at: Some(t0()),
        started_at: None,
        stopped_at: None,
        project: Some("ios".to_string()),
        branch: None,
        message: None,
        html_url: None,
    }
}

/// Replays canned listing responses in order and records each call.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<UpstreamBuild>, u16>>>,
    artifacts: Mutex<HashMap<String, Vec<UpstreamArtifact>>>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            artifacts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Queue a successful page.
    pub fn push_page(&self, builds: Vec<UpstreamBuild>) {
        self.responses.lock().unwrap().push_back(Ok(builds));
    }

    /// Queue an upstream failure with the given HTTP status.
    pub fn push_error(&self, status: u16) {
        self.responses.lock().unwrap().push_back(Err(status));
    }

    /// Attach artifacts to a build key.
    pub fn set_artifacts(&self, key: &str, artifacts: Vec<UpstreamArtifact>) {
        self.artifacts
            .lock()
            .unwrap()
            .insert(key.to_string(), artifacts);
    }

    /// `(limit, offset)` of every listing call so far.
    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildSource for ScriptedSource {
    fn driver(&self) -> Driver {
        Driver::Buildkite
    }

    async fn list_builds(&self, limit: u32, offset: u32) -> UpstreamResult<Vec<UpstreamBuild>> {
        self.calls.lock().unwrap().push((limit, offset));
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(builds)) => Ok(builds),
            Some(Err(status)) => Err(UpstreamError::Status {
                status,
                url: "https://upstream.test/builds".to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn list_artifacts(&self, build: &UpstreamBuild) -> UpstreamResult<Vec<UpstreamArtifact>> {
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .get(&build.key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Blocks inside `list_builds` until released.
pub struct GatedSource {
    pub entered: Notify,
    pub release: Notify,
}

impl GatedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl BuildSource for GatedSource {
    fn driver(&self) -> Driver {
        Driver::Circleci
    }

    async fn list_builds(&self, _limit: u32, _offset: u32) -> UpstreamResult<Vec<UpstreamBuild>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }
}
