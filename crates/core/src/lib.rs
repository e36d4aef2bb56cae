//! Core domain types shared by every depot crate.
//!
//! This crate defines the canonical data model:
//! - Builds and their lifecycle state
//! - Artifacts with their kind and producing driver
//! - Install manifest rendering for over-the-air iOS installs
//! - Configuration types

pub mod artifact;
pub mod build;
pub mod config;
pub mod error;
pub mod manifest;

pub use artifact::{Artifact, ArtifactKind, Driver};
pub use build::{Build, BuildState};
pub use error::{Error, Result};
pub use manifest::InstallManifest;

/// Maximum number of builds returned by a single list query.
pub const DEFAULT_QUERY_LIMIT: u32 = 300;

/// Compose the canonical entity id for a provider-scoped key.
pub fn entity_id(driver: Driver, key: &str) -> String {
    format!("{}:{}", driver.as_str(), key)
}
