//! Test fixtures for seeding the entity store.

use depot_core::ArtifactKind;
use depot_metadata::{ArtifactRow, BuildRow, MetadataStore};
use time::OffsetDateTime;

/// A build row owned by `driver`.
pub fn build_row(driver: &str, key: &str, created_at: Option<OffsetDateTime>) -> BuildRow {
    BuildRow {
        build_id: format!("{driver}:{key}"),
        driver: driver.to_string(),
        state: "passed".to_string(),
        created_at,
        started_at: created_at,
        finished_at: created_at,
        project: Some("app".to_string()),
        branch: Some("main".to_string()),
        message: Some("Release".to_string()),
        html_url: None,
        updated_at: OffsetDateTime::now_utc(),
    }
}

/// An artifact row whose kind follows the file extension of `local_path`.
pub fn artifact_row(build: &BuildRow, key: &str, local_path: &str, download_url: &str) -> ArtifactRow {
    ArtifactRow {
        artifact_id: format!("{}:{key}", build.driver),
        build_id: build.build_id.clone(),
        kind: ArtifactKind::from_file_name(local_path).code(),
        driver: build.driver.clone(),
        download_url: download_url.to_string(),
        local_path: local_path.to_string(),
        file_size: Some(11),
        mime_type: Some("application/octet-stream".to_string()),
        created_at: OffsetDateTime::now_utc(),
    }
}

/// Store a build with its artifacts.
pub async fn seed(store: &dyn MetadataStore, build: &BuildRow, artifacts: &[ArtifactRow]) {
    store
        .ingest_build(build, artifacts)
        .await
        .expect("Failed to seed build");
}
