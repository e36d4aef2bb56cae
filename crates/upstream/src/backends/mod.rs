//! Upstream backend clients.

pub mod bintray;
pub mod buildkite;
pub mod circleci;

use crate::error::{UpstreamError, UpstreamResult};
use crate::traits::ByteStream;
use futures::StreamExt;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Build the shared HTTP client.
pub(crate) fn http_client(connect_timeout: Duration) -> UpstreamResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Parse an API base URL, forcing a trailing slash so `join` appends.
pub(crate) fn parse_base_url(base_url: &str) -> UpstreamResult<Url> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    Url::parse(&normalized).map_err(|e| UpstreamError::InvalidUrl(format!("{base_url}: {e}")))
}

pub(crate) fn join(base: &Url, path: &str) -> UpstreamResult<Url> {
    base.join(path)
        .map_err(|e| UpstreamError::InvalidUrl(format!("{path}: {e}")))
}

fn status_error(response: &reqwest::Response) -> UpstreamError {
    let mut url = response.url().clone();
    url.set_query(None);
    UpstreamError::Status {
        status: response.status().as_u16(),
        url: url.to_string(),
    }
}

/// Send a request and decode a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
) -> UpstreamResult<T> {
    let response = req.send().await?;
    if !response.status().is_success() {
        return Err(status_error(&response));
    }
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Send a request and hand back the body as a byte stream.
pub(crate) async fn send_stream(req: reqwest::RequestBuilder) -> UpstreamResult<ByteStream> {
    let response = req.send().await?;
    if !response.status().is_success() {
        return Err(status_error(&response));
    }
    Ok(response
        .bytes_stream()
        .map(|chunk| chunk.map_err(UpstreamError::from))
        .boxed())
}
