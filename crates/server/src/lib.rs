//! HTTP API server for the depot release aggregator.
//!
//! This crate provides:
//! - The sync engine that mirrors upstream CI builds into the entity store
//! - Build list queries with signed artifact URLs
//! - Signed install manifest and artifact download endpoints
//! - The path-token gate and request tracing middleware

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod query;
pub mod routes;
pub mod state;
pub mod sync;

pub use auth::{PathGate, TraceId};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use sync::{SyncEngine, SyncError, SyncState};
