//! Metadata store trait and implementations.

use crate::error::{MetadataError, MetadataResult};
use crate::models::StoreStats;
use crate::repos::{ArtifactRepo, BuildRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined entity store trait.
#[async_trait]
pub trait MetadataStore: BuildRepo + ArtifactRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;

    /// Entity counts.
    async fn stats(&self) -> MetadataResult<StoreStats> {
        Ok(StoreStats {
            builds: self.count_builds().await?,
            artifacts: self.count_artifacts().await?,
        })
    }
}

/// SQLite-based entity store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    query_timeout: Duration,
}

impl SqliteStore {
    /// Create a new SQLite store, creating the file and schema if needed.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        let path = path.as_ref();
        let query_timeout = Duration::from_secs(query_timeout_secs.unwrap_or(60));

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // Single writer; avoids "database is locked" under concurrent readers.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            query_timeout,
        };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "SQLite entity store opened");

        Ok(store)
    }

    /// Run a store operation under the configured query timeout.
    ///
    /// Dropping a timed-out transaction rolls it back.
    async fn with_timeout<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = MetadataResult<T>>,
    ) -> MetadataResult<T> {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let secs = self.query_timeout.as_secs();
                tracing::warn!(operation, timeout_secs = secs, "Entity store operation timed out");
                Err(MetadataError::Timeout { operation, secs })
            }
        }
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use depot_core::{Artifact, ArtifactKind, Build};
    use sqlx::QueryBuilder;
    use std::collections::HashMap;

    const UPSERT_BUILD_SQL: &str = r#"
        INSERT INTO builds (
            build_id, driver, state, created_at, started_at, finished_at,
            project, branch, message, html_url, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(build_id) DO UPDATE SET
            state = excluded.state,
            created_at = COALESCE(builds.created_at, excluded.created_at),
            started_at = excluded.started_at,
            finished_at = excluded.finished_at,
            project = excluded.project,
            branch = excluded.branch,
            message = excluded.message,
            html_url = excluded.html_url,
            updated_at = excluded.updated_at
    "#;

    const UPSERT_ARTIFACT_SQL: &str = r#"
        INSERT INTO artifacts (
            artifact_id, build_id, kind, driver, download_url, local_path,
            file_size, mime_type, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(artifact_id) DO UPDATE SET
            kind = excluded.kind,
            download_url = excluded.download_url,
            local_path = excluded.local_path,
            file_size = excluded.file_size,
            mime_type = excluded.mime_type
    "#;

    fn bind_build<'q>(
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        build: &'q BuildRow,
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        query
            .bind(&build.build_id)
            .bind(&build.driver)
            .bind(&build.state)
            .bind(build.created_at)
            .bind(build.started_at)
            .bind(build.finished_at)
            .bind(&build.project)
            .bind(&build.branch)
            .bind(&build.message)
            .bind(&build.html_url)
            .bind(build.updated_at)
    }

    fn bind_artifact<'q>(
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        artifact: &'q ArtifactRow,
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        query
            .bind(&artifact.artifact_id)
            .bind(&artifact.build_id)
            .bind(artifact.kind)
            .bind(&artifact.driver)
            .bind(&artifact.download_url)
            .bind(&artifact.local_path)
            .bind(artifact.file_size)
            .bind(&artifact.mime_type)
            .bind(artifact.created_at)
    }

    #[async_trait]
    impl BuildRepo for SqliteStore {
        async fn upsert_build(&self, build: &BuildRow) -> MetadataResult<()> {
            bind_build(sqlx::query(UPSERT_BUILD_SQL), build)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn ingest_build(
            &self,
            build: &BuildRow,
            artifacts: &[ArtifactRow],
        ) -> MetadataResult<()> {
            self.with_timeout("ingest_build", self.ingest_build_tx(build, artifacts))
                .await
        }

        async fn get_build(&self, build_id: &str) -> MetadataResult<Option<Build>> {
            self.with_timeout("get_build", self.load_build(build_id))
                .await
        }

        async fn find_builds(
            &self,
            kind: Option<ArtifactKind>,
            limit: u32,
        ) -> MetadataResult<Vec<Build>> {
            self.with_timeout("find_builds", self.query_builds(kind, limit))
                .await
        }

        async fn count_builds(&self) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM builds")
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }
    }

    impl SqliteStore {
        async fn ingest_build_tx(
            &self,
            build: &BuildRow,
            artifacts: &[ArtifactRow],
        ) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;

            bind_build(sqlx::query(UPSERT_BUILD_SQL), build)
                .execute(&mut *tx)
                .await?;

            for artifact in artifacts {
                if artifact.build_id != build.build_id {
                    return Err(MetadataError::Internal(format!(
                        "artifact {} belongs to {}, not {}",
                        artifact.artifact_id, artifact.build_id, build.build_id
                    )));
                }
                bind_artifact(sqlx::query(UPSERT_ARTIFACT_SQL), artifact)
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;
            Ok(())
        }

        async fn load_build(&self, build_id: &str) -> MetadataResult<Option<Build>> {
            let Some(row) =
                sqlx::query_as::<_, BuildRow>("SELECT * FROM builds WHERE build_id = ?")
                    .bind(build_id)
                    .fetch_optional(&self.pool)
                    .await?
            else {
                return Ok(None);
            };

            let artifacts = self.list_artifacts_for_build(build_id).await?;
            Ok(Some(row.into_build(artifacts)?))
        }

        async fn query_builds(
            &self,
            kind: Option<ArtifactKind>,
            limit: u32,
        ) -> MetadataResult<Vec<Build>> {
            let kind_code = kind
                .filter(|k| *k != ArtifactKind::Unknown)
                .map(|k| k.code());

            // Builds with unknown creation time are treated as newest.
            let rows = sqlx::query_as::<_, BuildRow>(
                r#"
                SELECT * FROM builds b
                WHERE ? IS NULL OR EXISTS (
                    SELECT 1 FROM artifacts a
                    WHERE a.build_id = b.build_id AND a.kind = ?
                )
                ORDER BY b.created_at IS NULL DESC, b.created_at DESC
                LIMIT ?
                "#,
            )
            .bind(kind_code)
            .bind(kind_code)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

            if rows.is_empty() {
                return Ok(Vec::new());
            }

            let mut query: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT * FROM artifacts WHERE build_id IN (");
            let mut ids = query.separated(", ");
            for row in &rows {
                ids.push_bind(row.build_id.clone());
            }
            ids.push_unseparated(") ORDER BY created_at, artifact_id");

            let artifact_rows = query
                .build_query_as::<ArtifactRow>()
                .fetch_all(&self.pool)
                .await?;

            let mut by_build: HashMap<String, Vec<Artifact>> = HashMap::new();
            for artifact in artifact_rows {
                by_build
                    .entry(artifact.build_id.clone())
                    .or_default()
                    .push(artifact.into());
            }

            rows.into_iter()
                .map(|row| {
                    let artifacts = by_build.remove(&row.build_id).unwrap_or_default();
                    row.into_build(artifacts)
                })
                .collect()
        }
    }

    #[async_trait]
    impl ArtifactRepo for SqliteStore {
        async fn upsert_artifact(&self, artifact: &ArtifactRow) -> MetadataResult<()> {
            let result = bind_artifact(sqlx::query(UPSERT_ARTIFACT_SQL), artifact)
                .execute(&self.pool)
                .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                    Err(MetadataError::NotFound(format!(
                        "build {} for artifact {}",
                        artifact.build_id, artifact.artifact_id
                    )))
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn get_artifact(&self, artifact_id: &str) -> MetadataResult<Option<Artifact>> {
            let query =
                sqlx::query_as::<_, ArtifactRow>("SELECT * FROM artifacts WHERE artifact_id = ?")
                    .bind(artifact_id)
                    .fetch_optional(&self.pool);
            let row = self
                .with_timeout("get_artifact", async { query.await.map_err(MetadataError::from) })
                .await?;
            Ok(row.map(Artifact::from))
        }

        async fn list_artifacts_for_build(&self, build_id: &str) -> MetadataResult<Vec<Artifact>> {
            let rows = sqlx::query_as::<_, ArtifactRow>(
                "SELECT * FROM artifacts WHERE build_id = ? ORDER BY created_at, artifact_id",
            )
            .bind(build_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows.into_iter().map(Artifact::from).collect())
        }

        async fn count_artifacts(&self) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artifacts")
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }
    }
}

impl std::convert::From<std::io::Error> for crate::MetadataError {
    fn from(e: std::io::Error) -> Self {
        crate::MetadataError::Config(e.to_string())
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- Builds: one row per upstream CI run
CREATE TABLE IF NOT EXISTS builds (
    build_id TEXT PRIMARY KEY,
    driver TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT,
    started_at TEXT,
    finished_at TEXT,
    project TEXT,
    branch TEXT,
    message TEXT,
    html_url TEXT,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_builds_created ON builds(created_at);

-- Artifacts: owned by builds
CREATE TABLE IF NOT EXISTS artifacts (
    artifact_id TEXT PRIMARY KEY,
    build_id TEXT NOT NULL REFERENCES builds(build_id) ON DELETE CASCADE,
    kind INTEGER NOT NULL DEFAULT 0,
    driver TEXT NOT NULL,
    download_url TEXT NOT NULL,
    local_path TEXT NOT NULL,
    file_size INTEGER,
    mime_type TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_artifacts_build ON artifacts(build_id);
CREATE INDEX IF NOT EXISTS idx_artifacts_kind ON artifacts(kind, build_id);
"#;
