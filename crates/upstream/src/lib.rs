//! Upstream CI backends and artifact download dispatch for depot.
//!
//! This crate provides:
//! - The [`BuildSource`] trait consumed by the sync engine
//! - CircleCI and Buildkite build listings
//! - Buildkite and Bintray artifact downloads behind a [`Dispatcher`]

pub mod backends;
pub mod dispatch;
pub mod error;
pub mod traits;

pub use backends::{bintray::BintrayClient, buildkite::BuildkiteClient, circleci::CircleciClient};
pub use dispatch::{ArtifactDownload, Dispatcher, DownloadMetadata};
pub use error::{DispatchError, DispatchResult, UpstreamError, UpstreamResult};
pub use traits::{BuildSource, ByteStream, UpstreamArtifact, UpstreamBuild};

use depot_core::config::AppConfig;
use std::sync::Arc;

/// Clients built from configuration.
pub struct Upstreams {
    /// One entry per configured build listing.
    pub sources: Vec<Arc<dyn BuildSource>>,
    pub dispatcher: Dispatcher,
}

/// Create upstream clients from configuration.
pub fn from_config(config: &AppConfig) -> UpstreamResult<Upstreams> {
    let connect_timeout = config.sync.connect_timeout();
    let mut sources: Vec<Arc<dyn BuildSource>> = Vec::new();

    if let Some(circleci) = &config.circleci {
        sources.push(Arc::new(CircleciClient::new(circleci, connect_timeout)?));
    }

    let buildkite = config
        .buildkite
        .as_ref()
        .map(|bk| BuildkiteClient::new(bk, connect_timeout))
        .transpose()?;
    if let Some(client) = &buildkite {
        sources.push(Arc::new(client.clone()));
    }

    let dispatcher = Dispatcher::new(buildkite, BintrayClient::new(connect_timeout)?);
    Ok(Upstreams {
        sources,
        dispatcher,
    })
}
