//! Shared helpers for upstream integration tests.

#![allow(dead_code)]

use depot_core::config::{BuildkiteConfig, CircleciConfig};
use depot_core::{Artifact, ArtifactKind};
use httpmock::MockServer;
use std::net::TcpListener;
use std::time::Duration;
use time::OffsetDateTime;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

pub fn circleci_config(server: &MockServer) -> CircleciConfig {
    CircleciConfig {
        token: "circle-token".to_string(),
        base_url: server.url("/api/v1.1/"),
    }
}

pub fn buildkite_config(server: &MockServer) -> BuildkiteConfig {
    BuildkiteConfig {
        token: "bk-token".to_string(),
        organization: "acme".to_string(),
        base_url: server.url("/v2"),
    }
}

pub fn artifact(driver: &str, download_url: String) -> Artifact {
    Artifact {
        id: format!("{driver}:artifact-1"),
        build_id: format!("{driver}:app/1"),
        kind: ArtifactKind::Ipa,
        driver: driver.to_string(),
        download_url,
        local_path: "build/App.ipa".to_string(),
        file_size: Some(11),
        mime_type: Some("application/octet-stream".to_string()),
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}
