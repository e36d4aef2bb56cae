//! Server test utilities.

use depot_core::config::AppConfig;
use depot_metadata::{MetadataStore, SqliteStore};
use depot_server::{AppState, SyncEngine, create_router};
use depot_signer::{Salt, UrlSigner};
use depot_upstream::BuildSource;
use std::sync::Arc;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

impl TestServer {
    /// Create a new test server with a temporary store and no build sources.
    pub async fn new() -> Self {
        Self::build_with(|_| {}, Vec::new()).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::build_with(modifier, Vec::new()).await
    }

    /// Create a test server whose status reports the given sources.
    /// Engines are not spawned; tests drive `refresh` themselves.
    pub async fn with_sources(sources: Vec<Arc<dyn BuildSource>>) -> Self {
        Self::build_with(|_| {}, sources).await
    }

    /// Create a test server with both config modifications and sources.
    pub async fn build_with<F>(modifier: F, sources: Vec<Arc<dyn BuildSource>>) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::for_testing();
        config.metadata.path = temp_dir.path().join("depot.db");
        modifier(&mut config);

        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&config.metadata.path, None)
                .await
                .expect("Failed to create metadata store"),
        );

        let upstreams =
            depot_upstream::from_config(&config).expect("Failed to create upstream clients");
        let engines = sources
            .into_iter()
            .map(|source| Arc::new(SyncEngine::new(source, metadata.clone(), &config.sync)))
            .collect();

        let salt = Salt::new(config.auth.salt.as_deref().unwrap_or("test-salt"))
            .expect("Failed to create salt");

        let state = AppState::new(
            config,
            metadata,
            UrlSigner::new(salt),
            upstreams.dispatcher,
            engines,
        )
        .expect("Failed to create app state");

        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying metadata.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// The signer the server verifies with.
    pub fn signer(&self) -> &UrlSigner {
        &self.state.signer
    }
}

/// Whether the sandbox allows binding a local port for mock upstreams.
pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}
