//! Bintray content downloads.

use super::{http_client, send_stream};
use crate::error::{UpstreamError, UpstreamResult};
use crate::traits::ByteStream;
use reqwest::Url;
use std::time::Duration;

/// Unauthenticated client for public Bintray content.
#[derive(Clone, Debug)]
pub struct BintrayClient {
    http: reqwest::Client,
}

impl BintrayClient {
    pub fn new(connect_timeout: Duration) -> UpstreamResult<Self> {
        Ok(Self {
            http: http_client(connect_timeout)?,
        })
    }

    /// Stream the content at `download_url`.
    pub async fn download(&self, download_url: &str) -> UpstreamResult<ByteStream> {
        let url = Url::parse(download_url)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{download_url}: {e}")))?;
        send_stream(self.http.get(url)).await
    }
}
