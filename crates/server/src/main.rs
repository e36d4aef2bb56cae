//! Depot server binary.

use anyhow::{Context, Result};
use clap::Parser;
use depot_core::config::AppConfig;
use depot_server::auth::configured_salt;
use depot_server::{AppState, SyncEngine, create_router};
use depot_signer::{Salt, UrlSigner};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Depot - CI build and artifact aggregator
#[derive(Parser, Debug)]
#[command(name = "depotd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DEPOT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Depot v{}", env!("CARGO_PKG_VERSION"));

    // Config file is optional; DEPOT_ env vars override it.
    let mut figment = Figment::new();
    if std::path::Path::new(&args.config).exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::info!(
            "No config file found at {}, using defaults and environment",
            args.config
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("DEPOT_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    depot_server::metrics::register_metrics();

    let metadata = depot_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!(path = %config.metadata.path.display(), "Metadata store initialized");

    let salt = match configured_salt(&config.auth).context("failed to load salt")? {
        Some(salt) => salt,
        None => {
            tracing::warn!(
                "No auth.salt or auth.salt_file configured, generated an ephemeral one; signed URLs will not survive a restart"
            );
            Salt::generate()
        }
    };

    let upstreams =
        depot_upstream::from_config(&config).context("failed to initialize upstream clients")?;
    if upstreams.sources.is_empty() {
        tracing::warn!("No build sources configured, sync is disabled");
    }

    let engines: Vec<Arc<SyncEngine>> = upstreams
        .sources
        .into_iter()
        .map(|source| Arc::new(SyncEngine::new(source, metadata.clone(), &config.sync)))
        .collect();
    let sync_handles: Vec<_> = engines
        .iter()
        .map(|engine| engine.clone().spawn(config.sync.interval()))
        .collect();

    let state = AppState::new(
        config.clone(),
        metadata,
        UrlSigner::new(salt),
        upstreams.dispatcher,
        engines,
    )
    .context("failed to build application state")?;

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for handle in sync_handles {
        handle.abort();
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
