//! Incremental synchronization of upstream builds into the entity store.
//!
//! Each [`SyncEngine`] owns one upstream [`BuildSource`] and keeps a map of
//! every build it has observed plus a cursor: the most recent build update
//! time seen so far.
//!
//! - With no cursor (cold), the engine walks history page by page, up to
//!   `max_pages`, publishing the map after every page and stopping at the
//!   first short page. The cursor becomes the latest stop time observed.
//! - With a cursor (warm), only the newest page is fetched. Records are
//!   walked oldest to newest; those updated after the previous cursor are
//!   merged and counted, and the cursor advances to the newest update time.
//!
//! Upstream and store calls never run under the state lock. A failed cycle
//! leaves the map and cursor as they were before it started.

use crate::metrics;
use depot_core::config::SyncConfig;
use depot_core::{ArtifactKind, entity_id};
use depot_metadata::repos::BuildRepo;
use depot_metadata::{ArtifactRow, BuildRow, MetadataError, MetadataStore};
use depot_upstream::{BuildSource, UpstreamArtifact, UpstreamBuild, UpstreamError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Sync cycle errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("upstream fetch failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("store write failed: {0}")]
    Store(#[from] MetadataError),

    #[error("a sync cycle is already in progress")]
    CycleInProgress,
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Builds observed so far and the high-water mark.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncState {
    /// `None` until a cycle has seen a dated build; forces a cold fetch.
    pub cursor: Option<OffsetDateTime>,
    /// Keyed by canonical build id.
    pub builds: BTreeMap<String, UpstreamBuild>,
}

/// Per-source summary for the status endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct SyncStatus {
    pub driver: &'static str,
    #[serde(with = "time::serde::rfc3339::option")]
    pub cursor: Option<OffsetDateTime>,
    pub builds: usize,
}

/// Keeps one upstream source's builds in sync with the entity store.
pub struct SyncEngine {
    source: Arc<dyn BuildSource>,
    store: Arc<dyn MetadataStore>,
    page_size: u32,
    max_pages: u32,
    state: Mutex<SyncState>,
    cycle: Mutex<()>,
}

impl SyncEngine {
    /// Create an engine in the cold state.
    pub fn new(
        source: Arc<dyn BuildSource>,
        store: Arc<dyn MetadataStore>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            source,
            store,
            page_size: config.page_size,
            max_pages: config.max_pages,
            state: Mutex::new(SyncState::default()),
            cycle: Mutex::new(()),
        }
    }

    /// Driver tag of the underlying source.
    pub fn driver(&self) -> &'static str {
        self.source.driver().as_str()
    }

    /// Copy of the current map and cursor.
    pub async fn snapshot(&self) -> SyncState {
        self.state.lock().await.clone()
    }

    /// Current cursor and map size.
    pub async fn status(&self) -> SyncStatus {
        let state = self.state.lock().await;
        SyncStatus {
            driver: self.driver(),
            cursor: state.cursor,
            builds: state.builds.len(),
        }
    }

    /// Run one sync cycle and return the number of builds merged.
    ///
    /// Cold cycles report every build fetched; warm cycles report builds
    /// updated since the previous cursor. Concurrent calls are rejected with
    /// [`SyncError::CycleInProgress`].
    pub async fn refresh(&self) -> SyncResult<usize> {
        let Ok(_cycle) = self.cycle.try_lock() else {
            return Err(SyncError::CycleInProgress);
        };

        let driver = self.driver();
        let cursor = self.state.lock().await.cursor;
        let mode = if cursor.is_some() { "warm" } else { "cold" };
        let started = Instant::now();

        let result = match cursor {
            None => self.refresh_cold().await,
            Some(previous) => self.refresh_warm(previous).await,
        };

        metrics::SYNC_CYCLE_DURATION
            .with_label_values(&[driver, mode])
            .observe(started.elapsed().as_secs_f64());
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::SYNC_CYCLES
            .with_label_values(&[driver, mode, outcome])
            .inc();
        metrics::SYNC_TRACKED_BUILDS
            .with_label_values(&[driver])
            .set(self.state.lock().await.builds.len() as i64);

        result
    }

    async fn refresh_cold(&self) -> SyncResult<usize> {
        tracing::info!(driver = self.driver(), "Initial builds fetch");

        let snapshot = self.state.lock().await.builds.clone();
        match self.fetch_history(snapshot.clone()).await {
            Ok((fetched, most_recent)) => {
                let mut state = self.state.lock().await;
                if most_recent > state.cursor {
                    state.cursor = most_recent;
                }
                tracing::info!(
                    driver = self.driver(),
                    fetched,
                    builds = state.builds.len(),
                    "Fetched initial builds"
                );
                Ok(fetched)
            }
            Err(e) => {
                self.state.lock().await.builds = snapshot;
                Err(e)
            }
        }
    }

    /// Page through history, publishing after every page.
    async fn fetch_history(
        &self,
        mut builds: BTreeMap<String, UpstreamBuild>,
    ) -> SyncResult<(usize, Option<OffsetDateTime>)> {
        let mut fetched = 0;
        let mut most_recent: Option<OffsetDateTime> = None;

        for page in 0..self.max_pages {
            let Some(offset) = page.checked_mul(self.page_size) else {
                tracing::warn!(driver = self.driver(), page, "Page offset overflow, stopping history fetch");
                break;
            };
            let records = self.source.list_builds(self.page_size, offset).await?;
            let page_len = records.len();

            for record in records {
                if let Some(stop) = record.stopped_at
                    && most_recent.is_none_or(|m| stop > m)
                {
                    most_recent = Some(stop);
                }
                self.ingest(&record).await?;
                builds.insert(record.id(), record);
                fetched += 1;
            }

            self.state.lock().await.builds = builds.clone();

            if page_len < self.page_size as usize {
                break;
            }
        }

        Ok((fetched, most_recent))
    }

    async fn refresh_warm(&self, previous: OffsetDateTime) -> SyncResult<usize> {
        let mut records = self.source.list_builds(self.page_size, 0).await?;
        // Newest first upstream; apply oldest first.
        records.reverse();

        let mut most_recent = previous;
        let mut changed = Vec::new();
        for record in records {
            let Some(updated) = record.update_time() else {
                continue;
            };
            if updated > most_recent {
                most_recent = updated;
            }
            if updated > previous {
                changed.push(record);
            }
        }

        if changed.is_empty() {
            return Ok(0);
        }

        for record in &changed {
            self.ingest(record).await?;
        }

        let count = changed.len();
        let mut state = self.state.lock().await;
        for record in changed {
            state.builds.insert(record.id(), record);
        }
        state.cursor = Some(most_recent);
        drop(state);

        metrics::SYNC_BUILDS_CHANGED
            .with_label_values(&[self.driver()])
            .inc_by(count as u64);
        tracing::info!(driver = self.driver(), changed = count, "Fetched new builds");
        Ok(count)
    }

    /// Write a build, and its artifacts once finished, to the store.
    async fn ingest(&self, build: &UpstreamBuild) -> SyncResult<()> {
        let now = OffsetDateTime::now_utc();
        let row = build_row(build, now);

        let artifacts = if build.is_finished() {
            self.source
                .list_artifacts(build)
                .await?
                .iter()
                .map(|artifact| artifact_row(build, artifact, now))
                .collect()
        } else {
            Vec::new()
        };

        self.store.ingest_build(&row, &artifacts).await?;
        Ok(())
    }

    /// Run `refresh` forever, sleeping `interval` after each cycle.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                driver = self.driver(),
                interval_secs = interval.as_secs(),
                "Sync engine started"
            );
            loop {
                if let Err(e) = self.refresh().await {
                    tracing::warn!(driver = self.driver(), error = %e, "Sync cycle failed");
                }
                tokio::time::sleep(interval).await;
            }
        })
    }
}

fn build_row(build: &UpstreamBuild, now: OffsetDateTime) -> BuildRow {
    BuildRow {
        build_id: build.id(),
        driver: build.driver.as_str().to_string(),
        state: build.state.as_str().to_string(),
        created_at: Some(build.created_at.or(build.started_at).unwrap_or(now)),
        started_at: build.started_at,
        finished_at: build.stopped_at,
        project: build.project.clone(),
        branch: build.branch.clone(),
        message: build.message.clone(),
        html_url: build.html_url.clone(),
        updated_at: now,
    }
}

fn artifact_row(build: &UpstreamBuild, artifact: &UpstreamArtifact, now: OffsetDateTime) -> ArtifactRow {
    ArtifactRow {
        artifact_id: entity_id(build.driver, &artifact.key),
        build_id: build.id(),
        kind: ArtifactKind::from_file_name(&artifact.local_path).code(),
        driver: build.driver.as_str().to_string(),
        download_url: artifact.download_url.clone(),
        local_path: artifact.local_path.clone(),
        file_size: artifact.size.and_then(|size| i64::try_from(size).ok()),
        mime_type: artifact.mime_type.clone(),
        created_at: build.stopped_at.unwrap_or(now),
    }
}
