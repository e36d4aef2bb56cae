//! Upstream listing clients against a mock HTTP API.

mod common;

use common::{CONNECT_TIMEOUT, buildkite_config, can_bind_localhost, circleci_config};
use depot_core::{BuildState, Driver};
use depot_upstream::{BuildSource, BuildkiteClient, CircleciClient, UpstreamError};
use httpmock::Method::GET;
use httpmock::MockServer;
use serde_json::json;
use time::macros::datetime;

#[tokio::test]
async fn circleci_lists_recent_builds() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1.1/recent-builds")
                .query_param("limit", "100")
                .query_param("offset", "200")
                .header("Circle-Token", "circle-token");
            then.status(200).json_body(json!([
                {
                    "build_num": 42,
                    "username": "acme",
                    "reponame": "app",
                    "status": "success",
                    "queued_at": "2024-05-01T09:59:00Z",
                    "start_time": "2024-05-01T10:00:00Z",
                    "stop_time": "2024-05-01T10:05:00Z",
                    "branch": "main",
                    "subject": "Bump version",
                    "build_url": "https://circleci.com/gh/acme/app/42"
                },
                {
                    "build_num": 43,
                    "username": "acme",
                    "reponame": "app",
                    "status": "queued",
                    "start_time": null,
                    "stop_time": null
                }
            ]));
        })
        .await;

    let client = CircleciClient::new(&circleci_config(&server), CONNECT_TIMEOUT).unwrap();
    let builds = client.list_builds(100, 200).await.unwrap();
    mock.assert_async().await;

    assert_eq!(builds.len(), 2);
    assert_eq!(builds[0].id(), "circleci:acme/app/42");
    assert_eq!(builds[0].state, BuildState::Passed);
    assert_eq!(builds[0].update_time(), Some(datetime!(2024-05-01 10:05 UTC)));
    assert_eq!(builds[1].state, BuildState::Scheduled);
    assert_eq!(builds[1].update_time(), None);

    // No artifact support for CircleCI.
    assert!(client.list_artifacts(&builds[0]).await.unwrap().is_empty());
}

#[tokio::test]
async fn circleci_error_status_is_reported() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1.1/recent-builds");
            then.status(503).body("unavailable");
        })
        .await;

    let client = CircleciClient::new(&circleci_config(&server), CONNECT_TIMEOUT).unwrap();
    match client.list_builds(100, 0).await {
        Err(UpstreamError::Status { status, url }) => {
            assert_eq!(status, 503);
            assert!(!url.contains('?'));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn circleci_malformed_body_is_decode_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1.1/recent-builds");
            then.status(200).body("{\"not\": \"a list\"}");
        })
        .await;

    let client = CircleciClient::new(&circleci_config(&server), CONNECT_TIMEOUT).unwrap();
    assert!(matches!(
        client.list_builds(100, 0).await,
        Err(UpstreamError::Decode(_))
    ));
}

#[tokio::test]
async fn buildkite_lists_builds_and_finished_artifacts() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    let builds_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/organizations/acme/builds")
                .query_param("page", "2")
                .query_param("per_page", "100")
                .header("Authorization", "Bearer bk-token");
            then.status(200).json_body(json!([
                {
                    "id": "0190b2f0-0000-0000-0000-000000000001",
                    "number": 7,
                    "state": "passed",
                    "created_at": "2024-05-01T10:00:00Z",
                    "started_at": "2024-05-01T10:01:00Z",
                    "finished_at": "2024-05-01T10:09:00Z",
                    "message": "Release",
                    "branch": "main",
                    "web_url": "https://buildkite.com/acme/ios/builds/7",
                    "pipeline": { "slug": "ios", "name": "iOS" }
                }
            ]));
        })
        .await;
    let artifacts_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/organizations/acme/pipelines/ios/builds/7/artifacts")
                .header("Authorization", "Bearer bk-token");
            then.status(200).json_body(json!([
                {
                    "id": "a1",
                    "path": "build/App.ipa",
                    "state": "finished",
                    "file_size": 1024,
                    "mime_type": "application/octet-stream",
                    "download_url": "https://api.buildkite.com/v2/a1/download"
                },
                {
                    "id": "a2",
                    "path": "build/Other.ipa",
                    "state": "new",
                    "download_url": "https://api.buildkite.com/v2/a2/download"
                }
            ]));
        })
        .await;

    let client = BuildkiteClient::new(&buildkite_config(&server), CONNECT_TIMEOUT).unwrap();
    assert_eq!(client.driver(), Driver::Buildkite);

    let builds = client.list_builds(100, 100).await.unwrap();
    builds_mock.assert_async().await;
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].id(), "buildkite:ios/7");
    assert!(builds[0].is_finished());

    let artifacts = client.list_artifacts(&builds[0]).await.unwrap();
    artifacts_mock.assert_async().await;
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].key, "a1");
    assert_eq!(artifacts[0].size, Some(1024));
}
