use serde::{Deserialize, Serialize};

/// Process-wide economic and physical parameters of the bidding strategy.
///
/// Everything here is constant after startup except `current_soc` and
/// `equivalent_full_cycles`, which the dispatch controller's SOC monitor
/// (T1) mutates every tick. Construct once in `AppState::new` and share via
/// `Arc`; never clone-and-drift a second instance in a running process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyState {
    pub battery_capacity_kwh: f64,
    pub round_trip_efficiency: f64,
    pub min_soc: f64,
    pub max_soc: f64,
    pub current_soc: f64,
    pub replacement_cost: f64,
    pub k_delta_e1: f64,
    pub k_delta_e2: f64,
    pub cycles_to_eol: f64,
    pub risk_premium: f64,
    pub alpha: f64,
    pub beta: f64,
    pub max_grid_demand: f64,
    pub equivalent_full_cycles: f64,
}

/// Chemistry-specific defaults for the Millner exponential degradation model.
/// LFP coefficients per spec; other chemistries would need their own tuning.
pub const DEFAULT_K_DELTA_E1: f64 = 0.693;
pub const DEFAULT_K_DELTA_E2: f64 = 3.31;
pub const DEFAULT_CYCLES_TO_EOL: f64 = 5000.0;
pub const DEFAULT_MIN_SOC: f64 = 0.10;
pub const DEFAULT_MAX_SOC: f64 = 0.90;
pub const DEFAULT_ALPHA: f64 = 0.3;
pub const DEFAULT_BETA: f64 = 0.2;

#[derive(Debug, thiserror::Error)]
pub enum StrategyConfigError {
    #[error("battery_capacity_kwh must be positive and finite, got {0}")]
    InvalidCapacity(f64),
    #[error("round_trip_efficiency must be in (0,1], got {0}")]
    InvalidEfficiency(f64),
    #[error("min_soc ({min}) must be less than max_soc ({max})")]
    SocBoundsInverted { min: f64, max: f64 },
    #[error("current_soc ({soc}) must lie within [min_soc, max_soc] = [{min}, {max}]")]
    SocOutOfRange { soc: f64, min: f64, max: f64 },
}

impl StrategyState {
    /// Construct a new strategy state, validating invariant I1 at birth.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        battery_capacity_kwh: f64,
        round_trip_efficiency: f64,
        min_soc: f64,
        max_soc: f64,
        initial_soc: f64,
        replacement_cost: f64,
        k_delta_e1: f64,
        k_delta_e2: f64,
        cycles_to_eol: f64,
        risk_premium: f64,
        alpha: f64,
        beta: f64,
        max_grid_demand: f64,
    ) -> Result<Self, StrategyConfigError> {
        if !battery_capacity_kwh.is_finite() || battery_capacity_kwh <= 0.0 {
            return Err(StrategyConfigError::InvalidCapacity(battery_capacity_kwh));
        }
        if !round_trip_efficiency.is_finite() || round_trip_efficiency <= 0.0 || round_trip_efficiency > 1.0 {
            return Err(StrategyConfigError::InvalidEfficiency(round_trip_efficiency));
        }
        if min_soc >= max_soc {
            return Err(StrategyConfigError::SocBoundsInverted { min: min_soc, max: max_soc });
        }
        if initial_soc < min_soc || initial_soc > max_soc {
            return Err(StrategyConfigError::SocOutOfRange {
                soc: initial_soc,
                min: min_soc,
                max: max_soc,
            });
        }

        Ok(Self {
            battery_capacity_kwh,
            round_trip_efficiency,
            min_soc,
            max_soc,
            current_soc: initial_soc,
            replacement_cost,
            k_delta_e1,
            k_delta_e2,
            cycles_to_eol,
            risk_premium,
            alpha,
            beta,
            max_grid_demand,
            equivalent_full_cycles: 0.0,
        })
    }

    /// Available energy above the SOC floor, in kWh (used by the fast-dispatch planner).
    pub fn available_kwh(&self) -> f64 {
        ((self.current_soc - self.min_soc) * self.battery_capacity_kwh).max(0.0)
    }

    /// Total dischargeable budget across the full operating band, in kWh
    /// (used by the day-ahead allocator).
    pub fn usable_band_kwh(&self) -> f64 {
        (self.max_soc - self.min_soc) * self.battery_capacity_kwh
    }

    /// Invariant I1: min_soc <= current_soc <= max_soc.
    pub fn soc_within_bounds(&self) -> bool {
        self.current_soc >= self.min_soc && self.current_soc <= self.max_soc
    }
}
