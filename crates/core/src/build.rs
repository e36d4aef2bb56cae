//! Builds and build lifecycle state.

use crate::artifact::{Artifact, Driver};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Normalized build state across providers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    #[default]
    Unknown,
    Scheduled,
    Running,
    Passed,
    Failed,
    Canceled,
    Skipped,
}

impl BuildState {
    /// Parse a provider status string. Unrecognised values map to `Unknown`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "scheduled" | "queued" | "not_running" | "blocked" | "creating" | "waiting" => {
                Self::Scheduled
            }
            "running" | "started" | "canceling" | "cancelling" => Self::Running,
            "passed" | "success" | "fixed" | "finished" => Self::Passed,
            "failed" | "failing" | "timedout" | "infrastructure_fail" | "broken" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            "skipped" | "not_run" => Self::Skipped,
            _ => Self::Unknown,
        }
    }

    /// Get the stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
        }
    }
}

/// One upstream CI run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Build {
    /// Canonical entity id, unique within the store.
    pub id: String,
    pub driver: Driver,
    pub state: BuildState,
    /// Set once at ingestion; `None` only for records the store could not date.
    pub created_at: Option<OffsetDateTime>,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
    pub project: Option<String>,
    pub branch: Option<String>,
    pub message: Option<String>,
    pub html_url: Option<String>,
    pub artifacts: Vec<Artifact>,
}
