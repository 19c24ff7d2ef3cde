#![allow(dead_code)]
pub mod state_machine;

use crate::config::AppConfig;
use crate::domain::{ForecastSnapshot, RainflowLedger, StrategyState, MIN_RECORDABLE_DEPTH};
use crate::hardware::factory::BatteryBusFactory;
use crate::hardware::{BatteryBus, SocFilter};
use crate::market::{HttpMarketDataSource, MarketDataSource};
use crate::planner;
use crate::transport::{BidKind, BidTransport, HttpBidTransport};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use state_machine::{DispatchStateMachine, ANTI_FLUTTER_SECONDS};
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Bound on the in-memory persistent log exposed via C7's `/safety/events`
/// (spec.md §7: "append-only ... timestamp and event category").
const SAFETY_LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SafetyEventCategory {
    SocLatch,
    AntiFlutterReset,
    ForecastUpdate,
    Dispatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetyEvent {
    pub timestamp: DateTime<Utc>,
    pub category: SafetyEventCategory,
    pub message: String,
}

#[derive(Default)]
pub struct SafetyLog {
    events: Mutex<VecDeque<SafetyEvent>>,
}

impl SafetyLog {
    async fn push(&self, category: SafetyEventCategory, message: impl Into<String>) {
        let mut events = self.events.lock().await;
        if events.len() == SAFETY_LOG_CAPACITY {
            events.pop_front();
        }
        events.push_back(SafetyEvent { timestamp: Utc::now(), category, message: message.into() });
    }

    pub async fn recent(&self) -> Vec<SafetyEvent> {
        self.events.lock().await.iter().cloned().collect()
    }
}

/// Local hour T3 wakes up and, once per day, submits the day-ahead
/// allocation (spec.md §4.6).
const DAY_AHEAD_ACTION_HOUR: u32 = 2;

/// Forecast refresh cadence for T4 (spec.md §4.6), in seconds.
const FORECAST_REFRESH_INTERVAL_SECONDS: i64 = 3600;

/// Bookkeeping for a single periodic task, exposed read-only via the
/// observability surface (C7). Mirrors the teacher's `scheduler::TaskStatus`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskStatus {
    pub last_run: Option<chrono::DateTime<Utc>>,
    pub last_error: Option<String>,
    pub run_count: u64,
}

#[derive(Default)]
pub struct TaskStatusBoard {
    pub soc_monitor: RwLock<TaskStatus>,
    pub fast_dispatch: RwLock<TaskStatus>,
    pub day_ahead: RwLock<TaskStatus>,
    pub forecast_refresh: RwLock<TaskStatus>,
}

async fn record_task_status(slot: &RwLock<TaskStatus>, result: &Result<()>) {
    let mut status = slot.write().await;
    status.last_run = Some(Utc::now());
    status.run_count += 1;
    status.last_error = result.as_ref().err().map(|e| e.to_string());
}

/// Process-wide shared state and external collaborators for the dispatch
/// controller (C6). Construct once and share via `.clone()` — every field
/// is an `Arc`, so cloning `AppState` is cheap and shares the same
/// underlying locks across every task and the observability router.
#[derive(Clone)]
pub struct AppState {
    pub strategy: Arc<RwLock<StrategyState>>,
    pub ledger: Arc<Mutex<RainflowLedger>>,
    pub forecast: Arc<RwLock<ForecastSnapshot>>,
    pub soc_filter: Arc<Mutex<SocFilter>>,
    /// Serializes read-modify-write of the anti-flutter gate (spec.md §5):
    /// written by T1 on a safety-latch trip and by T2 on a successful dispatch.
    pub last_dispatch_ts: Arc<AtomicI64>,
    pub last_forecast_refresh_ts: Arc<AtomicI64>,
    /// Latches T3's "already dispatched today" so a scheduler hiccup that
    /// skips or repeats the 02:00 minute can't double- or zero-fire.
    pub day_ahead_last_run: Arc<Mutex<Option<NaiveDate>>>,
    pub dispatch_state: Arc<Mutex<DispatchStateMachine>>,
    pub battery_bus: Arc<dyn BatteryBus>,
    pub market: Arc<dyn MarketDataSource>,
    pub transport: Arc<dyn BidTransport>,
    pub timezone: Tz,
    pub tasks: Arc<TaskStatusBoard>,
    pub safety_log: Arc<SafetyLog>,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let strategy_state = StrategyState::new(
            config.battery.capacity_kwh,
            config.battery.round_trip_efficiency,
            config.battery.min_soc,
            config.battery.max_soc,
            config.battery.initial_soc,
            config.battery.replacement_cost,
            config.battery.k_delta_e1,
            config.battery.k_delta_e2,
            config.battery.cycles_to_eol,
            config.battery.risk_premium,
            config.battery.alpha,
            config.battery.beta,
            config.battery.max_grid_demand,
        )
        .context("invalid battery configuration")?;

        let timezone = Tz::from_str(&config.ephemeris.timezone).unwrap_or_else(|_| {
            warn!(timezone = %config.ephemeris.timezone, "unrecognized timezone, defaulting to UTC");
            chrono_tz::UTC
        });

        let factory = BatteryBusFactory::new(config.hardware.mode);
        let battery_bus = factory
            .create(
                strategy_state.current_soc,
                strategy_state.battery_capacity_kwh,
                config.hardware.modbus.as_ref().map(|m| m.address.as_str()),
                config.hardware.modbus.as_ref().map(|m| m.unit_id).unwrap_or(1),
            )
            .await;

        let market: Arc<dyn MarketDataSource> = Arc::new(HttpMarketDataSource::new(
            config.market.endpoint.clone(),
            Duration::from_secs(config.market.timeout_secs),
        )?);

        let transport: Arc<dyn BidTransport> = Arc::new(HttpBidTransport::new(
            config.transport.endpoint.clone(),
            Duration::from_secs(config.transport.timeout_secs),
        )?);

        Ok(Self {
            strategy: Arc::new(RwLock::new(strategy_state)),
            ledger: Arc::new(Mutex::new(RainflowLedger::new())),
            forecast: Arc::new(RwLock::new(ForecastSnapshot::empty())),
            soc_filter: Arc::new(Mutex::new(SocFilter::new())),
            last_dispatch_ts: Arc::new(AtomicI64::new(0)),
            last_forecast_refresh_ts: Arc::new(AtomicI64::new(0)),
            day_ahead_last_run: Arc::new(Mutex::new(None)),
            dispatch_state: Arc::new(Mutex::new(DispatchStateMachine::new())),
            battery_bus,
            market,
            transport,
            timezone,
            tasks: Arc::new(TaskStatusBoard::default()),
            safety_log: Arc::new(SafetyLog::default()),
        })
    }
}

/// Spawn the four cooperating periodic tasks described in spec.md §4.6.
/// Each runs on its own `tokio::time::interval` and never returns; a failed
/// tick is logged and the loop proceeds to the next iteration rather than
/// unwinding the task (spec.md §5, "no task performs unbounded blocking").
pub fn spawn_dispatch_tasks(state: AppState) {
    tokio::spawn(run_soc_monitor(state.clone()));
    tokio::spawn(run_fast_dispatch(state.clone()));
    tokio::spawn(run_day_ahead(state.clone()));
    tokio::spawn(run_forecast_refresh(state));
}

async fn run_soc_monitor(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;
        let result = soc_monitor_tick(&state).await;
        record_task_status(&state.tasks.soc_monitor, &result).await;
        if let Err(e) = result {
            warn!(error = %e, "SOC monitor tick failed");
        }
    }
}

/// Task T1, spec.md §4.6: read+filter SOC, record a cycle on a meaningful
/// swing, trip the safety latch below the floor, and advance the dispatch
/// state machine's cooldown timer.
async fn soc_monitor_tick(state: &AppState) -> Result<()> {
    let raw_soc = state.battery_bus.read_soc().await?;
    let temperature_c = state.battery_bus.read_temperature_c().await.unwrap_or(25.0);
    let filtered_soc = state.soc_filter.lock().await.push(raw_soc);

    let previous_soc = state.strategy.read().await.current_soc;
    let delta = (filtered_soc - previous_soc).abs();
    if delta > MIN_RECORDABLE_DEPTH {
        let mean_soc = (previous_soc + filtered_soc) / 2.0;
        state.ledger.lock().await.append_cycle(delta, mean_soc, temperature_c, Utc::now());
    }
    let equivalent_full_cycles = state.ledger.lock().await.equivalent_full_cycles();

    let min_soc = {
        let mut strategy = state.strategy.write().await;
        strategy.current_soc = filtered_soc;
        strategy.equivalent_full_cycles = equivalent_full_cycles;
        strategy.min_soc
    };

    state.dispatch_state.lock().await.tick_cooldown(Utc::now());

    if filtered_soc < min_soc {
        state.battery_bus.write_dr_enable(false).await?;
        warn!(filtered_soc, min_soc, "SOC below floor, DR disabled (safety latch)");
        state
            .safety_log
            .push(SafetyEventCategory::SocLatch, format!("filtered_soc {filtered_soc:.4} below floor {min_soc:.4}"))
            .await;
        state.dispatch_state.lock().await.force_idle();
        // Re-arm the anti-flutter gate from this moment so recovery above
        // the floor doesn't immediately permit a fresh dispatch.
        state.last_dispatch_ts.store(Utc::now().timestamp(), Ordering::SeqCst);
        state
            .safety_log
            .push(SafetyEventCategory::AntiFlutterReset, "gate reset by safety latch")
            .await;
    }

    Ok(())
}

async fn run_fast_dispatch(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;
        let result = fast_dispatch_tick(&state).await;
        record_task_status(&state.tasks.fast_dispatch, &result).await;
        if let Err(e) = result {
            warn!(error = %e, "fast-DR tick failed");
        }
    }
}

/// Task T2, spec.md §4.6: fast-dispatch bidding, gated by DR status and the
/// anti-flutter interval.
async fn fast_dispatch_tick(state: &AppState) -> Result<()> {
    if !state.battery_bus.read_dr_status().await? {
        return Ok(());
    }

    let now = Utc::now();
    let last_dispatch = state.last_dispatch_ts.load(Ordering::SeqCst);
    if now.timestamp() - last_dispatch < ANTI_FLUTTER_SECONDS {
        return Ok(());
    }

    let strategy_snapshot = state.strategy.read().await.clone();
    if !strategy_snapshot.soc_within_bounds() {
        return Ok(());
    }

    state.dispatch_state.lock().await.arm();

    let current_hour = now.with_timezone(&state.timezone).hour();
    let forecast = state.forecast.read().await.clone();
    let (market_price, grid_demand) = forecast.hour(current_hour as usize);

    let bid = planner::fast_dispatch_bid(
        &strategy_snapshot,
        &forecast,
        market_price,
        grid_demand,
        1.0,
        forecast.num_competitors,
        current_hour,
    );

    state.dispatch_state.lock().await.resolve_bid(bid.capacity_kwh);

    if bid.is_participating() {
        let rate = (bid.capacity_kwh * 100.0).round() as i64;
        state.battery_bus.write_discharge_rate(rate).await?;
        state.transport.submit_bid(BidKind::FastDispatch, bid.capacity_kwh, bid.price).await?;
        state.last_dispatch_ts.store(now.timestamp(), Ordering::SeqCst);
        state.dispatch_state.lock().await.dispatch_committed(Utc::now());
        info!(capacity_kwh = bid.capacity_kwh, price = bid.price, "fast-dispatch bid submitted");
        state
            .safety_log
            .push(SafetyEventCategory::Dispatch, format!("fast dispatch {:.3} kWh @ {:.4}", bid.capacity_kwh, bid.price))
            .await;
    }

    Ok(())
}

async fn run_day_ahead(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let result = day_ahead_tick(&state).await;
        record_task_status(&state.tasks.day_ahead, &result).await;
        if let Err(e) = result {
            warn!(error = %e, "day-ahead tick failed");
        }
    }
}

/// Task T3, spec.md §4.6: once per local day in the 02:00 minute, allocate
/// and submit the day-ahead bid schedule.
async fn day_ahead_tick(state: &AppState) -> Result<()> {
    let now_local = Utc::now().with_timezone(&state.timezone);
    if now_local.hour() != DAY_AHEAD_ACTION_HOUR {
        return Ok(());
    }

    let today = now_local.date_naive();
    {
        let mut last_run = state.day_ahead_last_run.lock().await;
        if *last_run == Some(today) {
            return Ok(());
        }
        *last_run = Some(today);
    }

    let snapshot = match state.market.refresh().await {
        Ok(fresh) => {
            *state.forecast.write().await = fresh.clone();
            state.last_forecast_refresh_ts.store(Utc::now().timestamp(), Ordering::SeqCst);
            fresh
        }
        Err(e) => {
            warn!(error = %e, "day-ahead market refresh failed, using last known snapshot");
            state.forecast.read().await.clone()
        }
    };

    let peak_mask = snapshot.derive_peak_mask();
    let strategy_snapshot = state.strategy.read().await.clone();
    let allocation = planner::day_ahead_allocation(&strategy_snapshot, &snapshot.price_forecast, &peak_mask);

    for hour in 0..24usize {
        if allocation.capacity_kwh[hour] > 0.0 {
            state
                .transport
                .submit_bid(BidKind::DayAhead { hour: hour as u32 }, allocation.capacity_kwh[hour], allocation.price[hour])
                .await?;
        }
    }

    info!(total_kwh = allocation.total_capacity_kwh(), "day-ahead allocation submitted");
    Ok(())
}

async fn run_forecast_refresh(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let result = forecast_refresh_tick(&state).await;
        record_task_status(&state.tasks.forecast_refresh, &result).await;
        if let Err(e) = result {
            warn!(error = %e, "forecast refresh tick failed");
        }
    }
}

/// Task T4, spec.md §4.6: refresh the forecast snapshot every 3600s,
/// retaining the prior snapshot on failure.
async fn forecast_refresh_tick(state: &AppState) -> Result<()> {
    let now_ts = Utc::now().timestamp();
    let last = state.last_forecast_refresh_ts.load(Ordering::SeqCst);
    if now_ts - last < FORECAST_REFRESH_INTERVAL_SECONDS {
        return Ok(());
    }

    match state.market.refresh().await {
        Ok(snapshot) => {
            *state.forecast.write().await = snapshot;
            state.last_forecast_refresh_ts.store(now_ts, Ordering::SeqCst);
            state.safety_log.push(SafetyEventCategory::ForecastUpdate, "T4 periodic refresh").await;
        }
        Err(e) => {
            warn!(error = %e, "forecast refresh failed, retaining previous snapshot");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::simulated::{ScriptedBatteryBus, ScriptedReading};
    use crate::market::ScriptedMarketDataSource;
    use crate::transport::RecordingBidTransport;

    fn flat_forecast(price: f64) -> ForecastSnapshot {
        ForecastSnapshot {
            price_forecast: [price; 24],
            grid_demand_forecast: [20000.0; 24],
            num_competitors: 10,
        }
    }

    fn strategy() -> StrategyState {
        StrategyState::new(
            6.5, 0.95, 0.10, 0.90, 0.8, 4000.0, 0.693, 3.31, 5000.0, 0.05, 0.3, 0.2, 50000.0,
        )
        .unwrap()
    }

    fn test_state(
        battery_bus: Arc<dyn BatteryBus>,
        market: Arc<dyn MarketDataSource>,
        transport: Arc<dyn BidTransport>,
        forecast: ForecastSnapshot,
    ) -> AppState {
        AppState {
            strategy: Arc::new(RwLock::new(strategy())),
            ledger: Arc::new(Mutex::new(RainflowLedger::new())),
            forecast: Arc::new(RwLock::new(forecast)),
            soc_filter: Arc::new(Mutex::new(SocFilter::new())),
            last_dispatch_ts: Arc::new(AtomicI64::new(0)),
            last_forecast_refresh_ts: Arc::new(AtomicI64::new(Utc::now().timestamp())),
            day_ahead_last_run: Arc::new(Mutex::new(None)),
            dispatch_state: Arc::new(Mutex::new(DispatchStateMachine::new())),
            battery_bus,
            market,
            transport,
            timezone: chrono_tz::UTC,
            tasks: Arc::new(TaskStatusBoard::default()),
            safety_log: Arc::new(SafetyLog::default()),
        }
    }

    #[tokio::test]
    async fn scenario_s1_profitable_tick_writes_rate_and_submits_bid() {
        let bus = Arc::new(ScriptedBatteryBus::new([ScriptedReading {
            soc: 0.8,
            temperature_c: 25.0,
            dr_status: true,
        }]));
        let transport = Arc::new(RecordingBidTransport::default());
        let market = Arc::new(ScriptedMarketDataSource::always_succeeding(ForecastSnapshot::empty()));
        let state = test_state(bus.clone(), market, transport.clone(), flat_forecast(0.05));

        fast_dispatch_tick(&state).await.unwrap();

        assert_eq!(bus.written_rates.read().await.len(), 1);
        assert_eq!(transport.submitted.lock().await.len(), 1);
        assert!(state.last_dispatch_ts.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn scenario_s3_safety_latch_disables_dr_and_skips_dispatch() {
        let bus = Arc::new(ScriptedBatteryBus::new([ScriptedReading {
            soc: 0.09,
            temperature_c: 25.0,
            dr_status: true,
        }]));
        let transport = Arc::new(RecordingBidTransport::default());
        let market = Arc::new(ScriptedMarketDataSource::always_succeeding(ForecastSnapshot::empty()));
        let state = test_state(bus.clone(), market, transport, flat_forecast(0.05));

        // seed the SOC filter so the averaged reading actually drops below the floor
        for _ in 0..6 {
            soc_monitor_tick(&state).await.unwrap();
        }

        assert!(bus.dr_enable_writes.read().await.contains(&false));
        assert_eq!(state.dispatch_state.lock().await.state(), state_machine::DispatchState::Idle);
    }

    #[tokio::test]
    async fn anti_flutter_gate_blocks_dispatch_within_the_interval() {
        let bus = Arc::new(ScriptedBatteryBus::new([ScriptedReading {
            soc: 0.8,
            temperature_c: 25.0,
            dr_status: true,
        }]));
        let transport = Arc::new(RecordingBidTransport::default());
        let market = Arc::new(ScriptedMarketDataSource::always_succeeding(ForecastSnapshot::empty()));
        let state = test_state(bus, market, transport.clone(), flat_forecast(0.05));
        state.last_dispatch_ts.store(Utc::now().timestamp(), Ordering::SeqCst);

        fast_dispatch_tick(&state).await.unwrap();

        assert!(transport.submitted.lock().await.is_empty());
    }
}
