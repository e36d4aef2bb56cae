//! Entity store for depot.
//!
//! This crate holds the canonical build and artifact records:
//! - Builds keyed by provider-scoped id, upserted idempotently
//! - Artifacts owned by builds, tagged with kind and driver
//! - Relationship-aware queries ("builds having an artifact of kind K")
//!
//! Only the sync engine writes here; query and download paths read.

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::{ArtifactRow, BuildRow, StoreStats};
pub use store::{MetadataStore, SqliteStore};

use depot_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    let store = SqliteStore::new(&config.path, config.query_timeout_secs).await?;
    Ok(Arc::new(store) as Arc<dyn MetadataStore>)
}
