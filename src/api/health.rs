use axum::{extract::State, Json};
use serde::Serialize;

use crate::controller::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// GET /healthz — liveness only. Never touches the dispatch loop's locks
/// beyond a point-in-time read, so a slow battery bus can't wedge this probe.
pub async fn healthz(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", timestamp: chrono::Utc::now() })
}
