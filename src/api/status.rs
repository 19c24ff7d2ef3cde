use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::controller::{state_machine::DispatchState, AppState};

/// A read-only snapshot of the strategy/dispatch state, for dashboards and
/// operator tooling. Never consumed by the dispatch loop itself.
#[derive(Debug, Serialize)]
pub struct SystemStatus {
    timestamp: DateTime<Utc>,
    soc: f64,
    equivalent_full_cycles: f64,
    dispatch_state: DispatchState,
    last_dispatch_ts: Option<DateTime<Utc>>,
    forecast_competitors: u32,
    tasks: TaskStatusSnapshot,
}

#[derive(Debug, Serialize)]
struct TaskStatusSnapshot {
    soc_monitor: crate::controller::TaskStatus,
    fast_dispatch: crate::controller::TaskStatus,
    day_ahead: crate::controller::TaskStatus,
    forecast_refresh: crate::controller::TaskStatus,
}

pub async fn status(State(state): State<AppState>) -> Json<SystemStatus> {
    let strategy = state.strategy.read().await;
    let dispatch_state = state.dispatch_state.lock().await.state();
    let forecast = state.forecast.read().await;

    let last_dispatch_ts = match state.last_dispatch_ts.load(std::sync::atomic::Ordering::SeqCst) {
        0 => None,
        secs => DateTime::from_timestamp(secs, 0),
    };

    Json(SystemStatus {
        timestamp: Utc::now(),
        soc: strategy.current_soc,
        equivalent_full_cycles: strategy.equivalent_full_cycles,
        dispatch_state,
        last_dispatch_ts,
        forecast_competitors: forecast.num_competitors,
        tasks: TaskStatusSnapshot {
            soc_monitor: state.tasks.soc_monitor.read().await.clone(),
            fast_dispatch: state.tasks.fast_dispatch.read().await.clone(),
            day_ahead: state.tasks.day_ahead.read().await.clone(),
            forecast_refresh: state.tasks.forecast_refresh.read().await.clone(),
        },
    })
}
