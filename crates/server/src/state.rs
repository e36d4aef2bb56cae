//! Application state shared across handlers.

use crate::auth::PathGate;
use crate::sync::SyncEngine;
use depot_core::config::AppConfig;
use depot_metadata::MetadataStore;
use depot_signer::UrlSigner;
use depot_upstream::Dispatcher;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Entity store (read-only from handlers).
    pub metadata: Arc<dyn MetadataStore>,
    /// Signed URL authority.
    pub signer: Arc<UrlSigner>,
    /// Artifact download routing.
    pub dispatcher: Arc<Dispatcher>,
    /// One engine per configured build source.
    pub sync: Arc<[Arc<SyncEngine>]>,
    /// Compiled path-token gate.
    pub gate: Arc<PathGate>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Fails if a gate pattern does not compile.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        signer: UrlSigner,
        dispatcher: Dispatcher,
        sync: Vec<Arc<SyncEngine>>,
    ) -> depot_core::Result<Self> {
        let gate = PathGate::new(&config.auth.gated_patterns)?;

        Ok(Self {
            config: Arc::new(config),
            metadata,
            signer: Arc::new(signer),
            dispatcher: Arc::new(dispatcher),
            sync: sync.into(),
            gate: Arc::new(gate),
            started_at: Instant::now(),
        })
    }
}
