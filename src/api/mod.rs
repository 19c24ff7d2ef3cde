#![allow(dead_code)]
pub mod health;
pub mod safety;
pub mod status;

use axum::Router;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::controller::AppState;

/// Read-only observability surface (C7). Mounting this router has no effect
/// on the dispatch loop — every handler only ever reads from `AppState`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", axum::routing::get(health::healthz))
        .route("/status", axum::routing::get(status::status))
        .route("/safety/events", axum::routing::get(safety::recent_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .with_state(state)
}
