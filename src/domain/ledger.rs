use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded discharge/charge excursion.
///
/// No true rainflow peak-valley pairing is performed (see spec's "Rainflow
/// fidelity" design note) — each SOC swing past the 0.01 threshold is
/// recorded directly. Cost semantics of `degradation_cost_per_kwh` are the
/// contract; the pairing algorithm is a documented future extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CycleRecord {
    pub depth: f64,
    pub mean_soc: f64,
    pub temperature_c: f64,
    pub timestamp: DateTime<Utc>,
}

/// Sub-threshold motion is not recorded (invariant I2).
pub const MIN_RECORDABLE_DEPTH: f64 = 0.01;

/// Append-only cycle ledger backing the degradation cost model (C1).
///
/// Single-writer discipline: only the SOC monitor task (T1) appends;
/// every other task only reads `equivalent_full_cycles()` as a scalar.
#[derive(Debug, Default)]
pub struct RainflowLedger {
    cycles: Vec<CycleRecord>,
    equivalent_full_cycles: f64,
}

impl RainflowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cycle if `depth` exceeds the recordable threshold (I2).
    /// Silently ignored otherwise (R3: `update_state_of_charge(0)` must not
    /// grow the ledger or move `equivalent_full_cycles`).
    pub fn append_cycle(&mut self, depth: f64, mean_soc: f64, temperature_c: f64, timestamp: DateTime<Utc>) {
        if !(depth > MIN_RECORDABLE_DEPTH) {
            return;
        }
        if self.cycles.len() == self.cycles.capacity() {
            // Growth policy: double capacity rather than relying on the
            // allocator's amortized-growth default, so the "never drop a
            // cycle silently" policy is explicit and testable.
            let target = (self.cycles.capacity() * 2).max(8);
            self.cycles.reserve(target - self.cycles.len());
        }
        self.cycles.push(CycleRecord {
            depth,
            mean_soc,
            temperature_c,
            timestamp,
        });
        self.equivalent_full_cycles += depth; // invariant I3
    }

    /// Invariant I3: equivalent_full_cycles equals the sum of recorded depths.
    pub fn equivalent_full_cycles(&self) -> f64 {
        self.equivalent_full_cycles
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn cycles(&self) -> &[CycleRecord] {
        &self.cycles
    }
}

/// Stress factor S(delta) from the Millner exponential aging model.
fn stress_factor(depth_of_discharge: f64, k1: f64, k2: f64) -> f64 {
    k1 * depth_of_discharge * (k2 * depth_of_discharge).exp()
}

/// Degradation cost per kWh delivered for a discharge of the given depth of
/// discharge, per spec.md §4.1. `delta = 0` yields zero cost; `delta = 1` is
/// the clamp ceiling (deeper excursions are not physically meaningful).
pub fn degradation_cost_per_kwh(
    depth_of_discharge: f64,
    battery_capacity_kwh: f64,
    replacement_cost: f64,
    k_delta_e1: f64,
    k_delta_e2: f64,
    cycles_to_eol: f64,
) -> f64 {
    let delta = if !depth_of_discharge.is_finite() {
        0.0
    } else {
        depth_of_discharge.clamp(0.0, 1.0)
    };

    if delta <= 0.0 {
        return 0.0;
    }

    let stress = stress_factor(delta, k_delta_e1, k_delta_e2);
    let effective_cycles_to_eol = cycles_to_eol / stress;
    (replacement_cost / battery_capacity_kwh) * (delta / effective_cycles_to_eol)
}
