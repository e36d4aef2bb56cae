//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Externally visible base URL (e.g., "https://depot.example.com").
    /// When unset, the base URL is derived from `X-Forwarded-Proto` and `Host`.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Upper bound on builds returned by a single list query.
    #[serde(default = "default_query_limit")]
    pub query_limit: u32,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_query_limit() -> u32 {
    crate::DEFAULT_QUERY_LIMIT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: None,
            metrics_enabled: default_metrics_enabled(),
            query_limit: default_query_limit(),
        }
    }
}

/// Access-control configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret salt for signed URLs and path tokens.
    /// When unset, a random salt is generated at startup and every signed URL
    /// becomes invalid on restart. Rotating it revokes all outstanding URLs.
    /// WARNING: Prefer DEPOT_AUTH__SALT over storing the salt in a config file.
    #[serde(default)]
    pub salt: Option<String>,
    /// File holding the salt, read at startup. Mutually exclusive with `salt`.
    #[serde(default)]
    pub salt_file: Option<PathBuf>,
    /// Request path patterns that require a trailing path token.
    /// Each pattern must define the named groups `token` and `rest`; the token
    /// must equal the signature of `rest`.
    #[serde(default = "default_gated_patterns")]
    pub gated_patterns: Vec<String>,
}

fn default_gated_patterns() -> Vec<String> {
    vec![
        r"^/auth/artifact-download/(?P<token>[^/]+)/(?P<rest>.+)$".to_string(),
        r"^/auth/artifact-manifest/(?P<token>[^/]+)/(?P<rest>.+)$".to_string(),
    ]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            salt: None,
            salt_file: None,
            gated_patterns: default_gated_patterns(),
        }
    }
}

impl AuthConfig {
    /// Validate that every gate pattern names the groups the gate relies on.
    /// Patterns are compiled by the server; this only checks the group names.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(salt) = &self.salt
            && salt.is_empty()
        {
            return Err("auth.salt must not be empty when set".to_string());
        }
        if self.salt.is_some() && self.salt_file.is_some() {
            return Err("auth.salt and auth.salt_file are mutually exclusive".to_string());
        }
        for pattern in &self.gated_patterns {
            if !pattern.contains("(?P<token>") || !pattern.contains("(?P<rest>") {
                return Err(format!(
                    "auth.gated_patterns entry must define 'token' and 'rest' groups: {pattern}"
                ));
            }
        }
        Ok(())
    }
}

/// Metadata (entity store) configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// SQLite database file path.
    #[serde(default = "default_metadata_path")]
    pub path: PathBuf,
    /// Upper bound on a single store operation, in seconds (default 60).
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("./data/depot.db")
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: default_metadata_path(),
            query_timeout_secs: None,
        }
    }
}

impl MetadataConfig {
    /// Reject a zero timeout, which would fail every query.
    pub fn validate(&self) -> Result<(), String> {
        if self.query_timeout_secs == Some(0) {
            return Err("metadata.query_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Largest page the upstream listing APIs return. A larger request comes back
/// short and would end a history walk early.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Synchronization engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay between the end of one cycle and the start of the next.
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
    /// Records requested per upstream page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Maximum pages fetched during the initial full fetch.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// TCP connect timeout for upstream HTTP clients.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_sync_interval_secs() -> u64 {
    10
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    20
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl SyncConfig {
    /// Validate sync configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_secs == 0 {
            return Err("sync.interval_secs must be greater than 0".to_string());
        }
        if self.page_size == 0 {
            return Err("sync.page_size must be greater than 0".to_string());
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(format!(
                "sync.page_size must be at most {MAX_PAGE_SIZE} (upstream page limit)"
            ));
        }
        if self.max_pages == 0 {
            return Err("sync.max_pages must be greater than 0".to_string());
        }
        if self.max_pages.checked_mul(self.page_size).is_none() {
            return Err("sync.max_pages * sync.page_size overflows the page offset".to_string());
        }
        Ok(())
    }

    /// Interval between cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Connect timeout for upstream clients.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// CircleCI credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CircleciConfig {
    /// API token. WARNING: Prefer DEPOT_CIRCLECI__TOKEN over the config file.
    pub token: String,
    /// API base URL.
    #[serde(default = "default_circleci_base_url")]
    pub base_url: String,
}

fn default_circleci_base_url() -> String {
    "https://circleci.com/api/v1.1/".to_string()
}

/// Buildkite credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildkiteConfig {
    /// API token. WARNING: Prefer DEPOT_BUILDKITE__TOKEN over the config file.
    pub token: String,
    /// Organization slug whose builds are synchronized.
    pub organization: String,
    /// API base URL.
    #[serde(default = "default_buildkite_base_url")]
    pub base_url: String,
}

fn default_buildkite_base_url() -> String {
    "https://api.buildkite.com/v2/".to_string()
}

/// Values embedded in generated install manifests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_bundle_id")]
    pub bundle_id: String,
    #[serde(default = "default_manifest_title")]
    pub title: String,
    #[serde(default = "default_manifest_version")]
    pub version: String,
}

fn default_bundle_id() -> String {
    "com.example.app".to_string()
}

fn default_manifest_title() -> String {
    "Depot".to_string()
}

fn default_manifest_version() -> String {
    "0.0.1".to_string()
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            bundle_id: default_bundle_id(),
            title: default_manifest_title(),
            version: default_manifest_version(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Access-control configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Entity store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Synchronization engine configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// CircleCI backend (optional).
    #[serde(default)]
    pub circleci: Option<CircleciConfig>,
    /// Buildkite backend (optional).
    #[serde(default)]
    pub buildkite: Option<BuildkiteConfig>,
    /// Install manifest values.
    #[serde(default)]
    pub manifest: ManifestConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses a fixed salt and no upstream backends.
    pub fn for_testing() -> Self {
        Self {
            auth: AuthConfig {
                salt: Some("test-salt".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.auth.validate()?;
        self.metadata.validate()?;
        self.sync.validate()?;
        if self.server.query_limit == 0 {
            return Err("server.query_limit must be greater than 0".to_string());
        }
        Ok(())
    }
}
