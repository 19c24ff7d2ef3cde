use axum::{extract::State, Json};

use crate::controller::{AppState, SafetyEvent};

/// GET /safety/events — the in-memory tail of the persistent safety/dispatch
/// log described in spec.md §7 (SOC latch, anti-flutter reset, forecast
/// update, dispatch), most recent last.
pub async fn recent_events(State(state): State<AppState>) -> Json<Vec<SafetyEvent>> {
    Json(state.safety_log.recent().await)
}
