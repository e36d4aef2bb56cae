//! Route configuration.

use crate::auth::{gate_middleware, trace_middleware};
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/ping", get(handlers::ping))
        .route("/api/status", get(handlers::get_status))
        .route("/api/build-list", get(handlers::list_builds))
        // Signed with ?signature=
        .route(
            "/api/artifact-manifest/{artifact_id}",
            get(handlers::get_artifact_manifest),
        )
        .route(
            "/api/artifact-download/{artifact_id}",
            get(handlers::download_artifact),
        );

    // Verified by the path gate before reaching the handler
    let gated_routes = Router::new()
        .route(
            "/auth/artifact-manifest/{token}/{*artifact_id}",
            get(handlers::get_gated_artifact_manifest),
        )
        .route(
            "/auth/artifact-download/{token}/{*artifact_id}",
            get(handlers::download_gated_artifact),
        );

    let mut router = Router::new().merge(api_routes).merge(gated_routes);

    // When enabled, /metrics should be network-restricted to scrapers.
    if state.config.server.metrics_enabled {
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    // Order of execution: TraceLayer -> trace id span -> path gate -> handler
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate_middleware,
        ))
        .layer(middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
