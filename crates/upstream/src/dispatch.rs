//! Artifact download dispatch.
//!
//! Resolves an artifact's driver tag to a backend and streams its bytes.
//! The driver set is closed: every [`Driver`] is matched explicitly, and an
//! unparseable tag is an [`DispatchError::UnsupportedDriver`].

use crate::backends::bintray::BintrayClient;
use crate::backends::buildkite::BuildkiteClient;
use crate::error::{DispatchError, DispatchResult};
use crate::traits::ByteStream;
use depot_core::{Artifact, Driver};
use futures::{StreamExt, stream};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Caller-visible response metadata for an artifact download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadMetadata {
    pub content_disposition: String,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

impl DownloadMetadata {
    pub fn for_artifact(artifact: &Artifact) -> Self {
        let file_name = artifact.file_name().replace(['"', '\\'], "_");
        Self {
            content_disposition: format!("inline; filename=\"{file_name}\""),
            content_length: artifact.file_size.filter(|size| *size > 0),
            content_type: artifact.mime_type.clone().filter(|m| !m.is_empty()),
        }
    }
}

/// An opened download: metadata plus a body known to be non-empty.
pub struct ArtifactDownload {
    pub driver: Driver,
    pub metadata: DownloadMetadata,
    pub body: ByteStream,
}

impl std::fmt::Debug for ArtifactDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactDownload")
            .field("driver", &self.driver)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Routes downloads to the backend that hosts each artifact.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    buildkite: Option<BuildkiteClient>,
    bintray: BintrayClient,
}

impl Dispatcher {
    pub fn new(buildkite: Option<BuildkiteClient>, bintray: BintrayClient) -> Self {
        Self { buildkite, bintray }
    }

    /// Resolve the backend and start streaming.
    ///
    /// Waits for the first non-empty chunk so that an empty upstream body is
    /// reported as [`DispatchError::EmptyBody`] before any response is committed.
    pub async fn open(&self, artifact: &Artifact) -> DispatchResult<ArtifactDownload> {
        let driver = Driver::parse(&artifact.driver)
            .map_err(|_| DispatchError::UnsupportedDriver(artifact.driver.clone()))?;

        let body = match driver {
            Driver::Buildkite => {
                let client = self
                    .buildkite
                    .as_ref()
                    .ok_or(DispatchError::BackendUnconfigured(Driver::Buildkite))?;
                client.download(&artifact.download_url).await?
            }
            Driver::Bintray => self.bintray.download(&artifact.download_url).await?,
            Driver::Circleci => {
                return Err(DispatchError::UnsupportedDriver(driver.to_string()));
            }
        };

        tracing::debug!(artifact_id = %artifact.id, %driver, "Opened artifact download");

        Ok(ArtifactDownload {
            driver,
            metadata: DownloadMetadata::for_artifact(artifact),
            body: ensure_non_empty(body).await?,
        })
    }

    /// Stream an artifact into `sink`, returning the number of bytes written.
    ///
    /// Mid-stream transport failures are returned as-is; nothing is retried.
    pub async fn download<W>(&self, artifact: &Artifact, sink: &mut W) -> DispatchResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut download = self.open(artifact).await?;
        let mut written = 0u64;
        while let Some(chunk) = download.body.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        if written == 0 {
            return Err(DispatchError::EmptyBody);
        }
        Ok(written)
    }
}

async fn ensure_non_empty(mut body: ByteStream) -> DispatchResult<ByteStream> {
    loop {
        match body.next().await {
            Some(Ok(chunk)) if chunk.is_empty() => continue,
            Some(Ok(chunk)) => {
                return Ok(stream::once(async move { Ok(chunk) }).chain(body).boxed());
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(DispatchError::EmptyBody),
        }
    }
}
