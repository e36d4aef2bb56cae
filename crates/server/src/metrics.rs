//! Prometheus metrics for the depot server.
//!
//! Exposes metrics for sync cycles, artifact downloads, and signature checks.
//!
//! The `/metrics` endpoint is unauthenticated. Metric labels carry driver
//! tags and outcomes only, never artifact ids or signatures.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Sync metrics
pub static SYNC_CYCLES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "depot_sync_cycles_total",
            "Sync cycles by driver, mode and outcome",
        ),
        &["driver", "mode", "outcome"],
    )
    .expect("metric creation failed")
});

pub static SYNC_CYCLE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "depot_sync_cycle_duration_seconds",
            "Time taken by a sync cycle",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["driver", "mode"],
    )
    .expect("metric creation failed")
});

pub static SYNC_BUILDS_CHANGED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "depot_sync_builds_changed_total",
            "Builds merged by warm sync cycles",
        ),
        &["driver"],
    )
    .expect("metric creation failed")
});

pub static SYNC_TRACKED_BUILDS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "depot_sync_tracked_builds",
            "Builds currently held in the sync map",
        ),
        &["driver"],
    )
    .expect("metric creation failed")
});

// Access metrics
pub static ARTIFACT_DOWNLOADS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "depot_artifact_downloads_total",
            "Artifact download attempts by driver and outcome",
        ),
        &["driver", "outcome"],
    )
    .expect("metric creation failed")
});

pub static SIGNATURE_REJECTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "depot_signature_rejections_total",
            "Requests rejected for an invalid signature or path token",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(SYNC_CYCLES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SYNC_CYCLE_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SYNC_BUILDS_CHANGED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SYNC_TRACKED_BUILDS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ARTIFACT_DOWNLOADS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SIGNATURE_REJECTIONS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record the outcome of an artifact download attempt.
pub fn record_download(driver: &str, outcome: &str) {
    ARTIFACT_DOWNLOADS
        .with_label_values(&[driver, outcome])
        .inc();
}

/// Record a rejected signature (`url`) or path token (`path_token`).
pub fn record_signature_rejection(kind: &str) {
    SIGNATURE_REJECTIONS.with_label_values(&[kind]).inc();
}
