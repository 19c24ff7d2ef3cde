use chrono::{DateTime, Utc};

/// Dispatch opportunity state machine, spec.md §4.6.
///
/// `IDLE -> ARMED -> DISPATCHING -> COOLDOWN -> IDLE`, with an unconditional
/// `-> IDLE` transition from any state the instant SOC drops below the
/// floor (the safety latch always wins over economic logic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DispatchState {
    Idle,
    Armed,
    Dispatching,
    Cooldown,
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Minimum time between successive non-zero dispatches (anti-flutter gate,
/// spec.md §4.6/§5, property P4).
pub const ANTI_FLUTTER_SECONDS: i64 = 3600;

#[derive(Debug)]
pub struct DispatchStateMachine {
    state: DispatchState,
    cooldown_entered_at: Option<DateTime<Utc>>,
}

impl DispatchStateMachine {
    pub fn new() -> Self {
        Self { state: DispatchState::Idle, cooldown_entered_at: None }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Unconditional safety transition: from any state, to IDLE.
    pub fn force_idle(&mut self) {
        self.state = DispatchState::Idle;
        self.cooldown_entered_at = None;
    }

    /// `IDLE -> ARMED` when DR is active and SOC is at/above the floor.
    pub fn arm(&mut self) {
        if self.state == DispatchState::Idle {
            self.state = DispatchState::Armed;
        }
    }

    /// `ARMED -> DISPATCHING` (planner emitted capacity > 0) or
    /// `ARMED -> IDLE` (planner emitted capacity == 0).
    pub fn resolve_bid(&mut self, capacity_kwh: f64) {
        if self.state != DispatchState::Armed {
            return;
        }
        self.state = if capacity_kwh > 0.0 { DispatchState::Dispatching } else { DispatchState::Idle };
    }

    /// `DISPATCHING -> COOLDOWN` on a successful register write.
    pub fn dispatch_committed(&mut self, at: DateTime<Utc>) {
        if self.state == DispatchState::Dispatching {
            self.state = DispatchState::Cooldown;
            self.cooldown_entered_at = Some(at);
        }
    }

    /// `COOLDOWN -> IDLE` once the anti-flutter interval has elapsed.
    pub fn tick_cooldown(&mut self, now: DateTime<Utc>) {
        if self.state == DispatchState::Cooldown {
            if let Some(entered) = self.cooldown_entered_at {
                if (now - entered).num_seconds() >= ANTI_FLUTTER_SECONDS {
                    self.state = DispatchState::Idle;
                    self.cooldown_entered_at = None;
                }
            }
        }
    }
}

impl Default for DispatchStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
