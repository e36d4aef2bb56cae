//! Integration tests for HTTP API endpoints.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{TestServer, artifact_row, build_row, seed};
use depot_server::auth::gated_path;
use serde_json::Value;
use time::macros::datetime;
use tower::ServiceExt;

/// Helper to make GET requests with optional extra headers.
async fn get(
    router: &axum::Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let request = builder.body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body_bytes.to_vec())
}

/// Helper to make JSON GET requests.
async fn json_request(router: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(router, uri, &[]).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Two builds with mixed artifacts plus one with no artifacts.
async fn seed_catalog(server: &TestServer) {
    let store = server.metadata();

    let older = build_row("buildkite", "ios/1", Some(datetime!(2024-01-01 10:00 UTC)));
    seed(
        store.as_ref(),
        &older,
        &[
            artifact_row(&older, "ios-1-ipa", "out/App.ipa", "https://upstream.test/1.ipa"),
            artifact_row(&older, "ios-1-apk", "out/app.apk", "https://upstream.test/1.apk"),
        ],
    )
    .await;

    let newer = build_row("buildkite", "ios/2", Some(datetime!(2024-02-01 10:00 UTC)));
    seed(
        store.as_ref(),
        &newer,
        &[artifact_row(&newer, "ios-2-apk", "out/app.apk", "https://upstream.test/2.apk")],
    )
    .await;

    let empty = build_row("circleci", "acme/app/7", Some(datetime!(2024-03-01 10:00 UTC)));
    seed(store.as_ref(), &empty, &[]).await;
}

// =============================================================================
// Liveness and status
// =============================================================================

#[tokio::test]
async fn test_ping() {
    let server = TestServer::new().await;
    let (status, json) = json_request(&server.router, "/api/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({}));
}

#[tokio::test]
async fn test_status_reports_store_counts() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;

    let (status, json) = json_request(&server.router, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["builds"], 3);
    assert_eq!(json["artifacts"], 3);
    assert!(json.get("store_error").is_none());
    assert_eq!(json["sync"], serde_json::json!([]));
}

// =============================================================================
// Build list
// =============================================================================

#[tokio::test]
async fn test_build_list_newest_first() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;

    let (status, json) = json_request(&server.router, "/api/build-list").await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<_> = json["builds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        ids,
        vec!["circleci:acme/app/7", "buildkite:ios/2", "buildkite:ios/1"]
    );
    assert!(json.get("store_stats").is_none());
}

#[tokio::test]
async fn test_build_list_filter_narrows_builds_and_artifacts() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;

    for filter in ["ipa", "1"] {
        let uri = format!("/api/build-list?artifact_kind={filter}");
        let (status, json) = json_request(&server.router, &uri).await;
        assert_eq!(status, StatusCode::OK);

        let builds = json["builds"].as_array().unwrap();
        assert_eq!(builds.len(), 1, "filter {filter}");
        assert_eq!(builds[0]["id"], "buildkite:ios/1");

        let artifacts = builds[0]["artifacts"].as_array().unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0]["kind"], "ipa");
        assert!(artifacts[0]["manifest_url"].is_string());
    }
}

#[tokio::test]
async fn test_build_list_unknown_kind_disables_filter() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;

    let (status, json) = json_request(&server.router, "/api/build-list?artifact_kind=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["builds"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_build_list_rejects_invalid_kind() {
    let server = TestServer::new().await;
    let (status, json) =
        json_request(&server.router, "/api/build-list?artifact_kind=zip").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("zip"));
}

#[tokio::test]
async fn test_build_list_never_exposes_upstream_urls() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;

    let (_, body) = get(&server.router, "/api/build-list", &[]).await;
    let body = String::from_utf8(body).unwrap();
    assert!(!body.contains("upstream.test"));
    assert!(body.contains("/api/artifact-download/buildkite:ios-1-ipa?signature="));
}

#[tokio::test]
async fn test_build_list_with_stats() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;

    let (status, json) =
        json_request(&server.router, "/api/build-list?with_stats=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["store_stats"]["builds"], 3);
    assert_eq!(json["store_stats"]["artifacts"], 3);
}

#[tokio::test]
async fn test_build_list_respects_query_limit() {
    let server = TestServer::with_config(|config| {
        config.server.query_limit = 2;
    })
    .await;
    seed_catalog(&server).await;

    let (_, json) = json_request(&server.router, "/api/build-list").await;
    assert_eq!(json["builds"].as_array().unwrap().len(), 2);
}

// =============================================================================
// Install manifests
// =============================================================================

#[tokio::test]
async fn test_manifest_requires_signature() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;

    let (status, json) =
        json_request(&server.router, "/api/artifact-manifest/buildkite:ios-1-ipa").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "unauthorized");

    let (status, _) = json_request(
        &server.router,
        "/api/artifact-manifest/buildkite:ios-1-ipa?signature=00ff",
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_manifest_for_missing_artifact_is_not_found() {
    let server = TestServer::new().await;
    let uri = server
        .signer()
        .sign_path("GET", "/api/artifact-manifest/buildkite:missing");

    let (status, json) = json_request(&server.router, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_manifest_rejects_non_ipa() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;
    let uri = server
        .signer()
        .sign_path("GET", "/api/artifact-manifest/buildkite:ios-1-apk");

    let (status, _) = json_request(&server.router, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manifest_uses_forwarded_origin() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;
    let uri = server
        .signer()
        .sign_path("GET", "/api/artifact-manifest/buildkite:ios-1-ipa");

    let (status, body) = get(
        &server.router,
        &uri,
        &[("host", "depot.test"), ("x-forwarded-proto", "https")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let plist = String::from_utf8(body).unwrap();
    let download = server
        .signer()
        .sign_path("GET", "/api/artifact-download/buildkite:ios-1-ipa");
    assert!(plist.contains(&format!("https://depot.test{download}")));
    assert!(plist.contains("software-package"));
}

#[tokio::test]
async fn test_manifest_prefers_public_url() {
    let server = TestServer::with_config(|config| {
        config.server.public_url = Some("https://builds.example.com/".to_string());
    })
    .await;
    seed_catalog(&server).await;
    let uri = server
        .signer()
        .sign_path("GET", "/api/artifact-manifest/buildkite:ios-1-ipa");

    let (status, body) = get(&server.router, &uri, &[("host", "internal:8080")]).await;
    assert_eq!(status, StatusCode::OK);
    let plist = String::from_utf8(body).unwrap();
    assert!(plist.contains("https://builds.example.com/api/artifact-download/"));
    assert!(!plist.contains("internal:8080"));
}

#[tokio::test]
async fn test_gated_manifest_accepts_path_token() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;

    let uri = gated_path(server.signer(), "/auth/artifact-manifest", "buildkite:ios-1-ipa");
    let (status, _) = get(&server.router, &uri, &[("host", "depot.test")]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_gated_routes_reject_wrong_token() {
    let server = TestServer::new().await;
    seed_catalog(&server).await;

    let other = server.signer().path_token("buildkite:ios-1-apk");
    let uri = format!("/auth/artifact-manifest/{other}/buildkite:ios-1-ipa");
    let (status, json) = json_request(&server.router, &uri).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "unauthorized");

    let (status, _) = json_request(
        &server.router,
        "/auth/artifact-download/deadbeef/buildkite:ios-1-ipa",
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gated_routes_without_patterns_are_closed() {
    let server = TestServer::with_config(|config| {
        config.auth.gated_patterns.clear();
    })
    .await;
    seed_catalog(&server).await;

    let uri = gated_path(server.signer(), "/auth/artifact-manifest", "buildkite:ios-1-ipa");
    let (status, _) = get(&server.router, &uri, &[("host", "depot.test")]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_endpoint_reports_rejections() {
    depot_server::metrics::register_metrics();
    let server = TestServer::new().await;

    let (status, _) = get(&server.router, "/api/artifact-download/buildkite:x", &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get(&server.router, "/metrics", &[]).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("depot_signature_rejections_total"));
}

#[tokio::test]
async fn test_metrics_endpoint_can_be_disabled() {
    let server = TestServer::with_config(|config| {
        config.server.metrics_enabled = false;
    })
    .await;

    let (status, _) = get(&server.router, "/metrics", &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
