//! Marginal cost, opportunity cost, and Nash-equilibrium markup (C2).
//!
//! Small, directly testable pure functions over `&StrategyState` — no I/O,
//! no locking, so the bid planner (C3) can call them without holding the
//! controller's shared-state lock across the calculation.

use crate::domain::StrategyState;

/// Daytime/nighttime base cost, $/kWh, per spec.md §4.2.
fn base_cost(hour: u32) -> f64 {
    if (6..=18).contains(&hour) {
        0.29
    } else {
        0.10
    }
}

/// Treat any non-finite reading as zero, per the "non-finite numerics"
/// design note: a failed sensor/forecast read must never contaminate a
/// cost calculation.
fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Opportunity cost from a forecast price vector, §4.2:
/// `o = 0.5 * max_i( p[i] * 0.9^i )`, time-discounted maximum future value.
/// Empty input yields zero.
pub fn opportunity_cost(forecast: &[f64]) -> f64 {
    if forecast.is_empty() {
        return 0.0;
    }
    let best = forecast
        .iter()
        .enumerate()
        .map(|(i, &p)| finite_or_zero(p) * 0.9f64.powi(i as i32))
        .fold(f64::NEG_INFINITY, f64::max);
    0.5 * best
}

/// Marginal cost of dispatching at hour `h` with depth of discharge `delta`
/// and opportunity cost `o`, per spec.md §4.2.
pub fn marginal_cost(state: &StrategyState, hour: u32, delta_of_discharge: f64, opportunity: f64) -> f64 {
    let deg = crate::domain::degradation_cost_per_kwh(
        delta_of_discharge,
        state.battery_capacity_kwh,
        state.replacement_cost,
        state.k_delta_e1,
        state.k_delta_e2,
        state.cycles_to_eol,
    );
    let o = finite_or_zero(opportunity);
    (base_cost(hour) + deg + o + state.risk_premium) / state.round_trip_efficiency
}

/// Nash-equilibrium markup and resulting price, per spec.md §4.2:
/// `mu = alpha * min(D / max_grid_demand, 1.5) / (N * beta + 1)`
/// `p_nash = p_m * (1 + mu)`
///
/// B2: `num_competitors == 0` must not divide by zero — the `N * beta + 1`
/// denominator is always >= 1, so this holds by construction.
pub fn nash_price(state: &StrategyState, market_price: f64, grid_demand: f64, num_competitors: u32) -> f64 {
    let p_m = finite_or_zero(market_price);
    let d = finite_or_zero(grid_demand);
    let demand_ratio = if state.max_grid_demand > 0.0 {
        (d / state.max_grid_demand).min(1.5)
    } else {
        0.0
    };
    let mu = state.alpha * demand_ratio / (num_competitors as f64 * state.beta + 1.0);
    p_m * (1.0 + mu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StrategyState;

    fn state() -> StrategyState {
        StrategyState::new(
            6.5, 0.95, 0.10, 0.90, 0.8, 4000.0, 0.693, 3.31, 5000.0, 0.05, 0.3, 0.2, 50000.0,
        )
        .unwrap()
    }

    #[test]
    fn base_cost_is_peak_during_daytime_window() {
        assert_eq!(base_cost(6), 0.29);
        assert_eq!(base_cost(18), 0.29);
        assert_eq!(base_cost(5), 0.10);
        assert_eq!(base_cost(19), 0.10);
    }

    #[test]
    fn opportunity_cost_is_zero_for_empty_forecast() {
        assert_eq!(opportunity_cost(&[]), 0.0);
    }

    #[test]
    fn opportunity_cost_discounts_future_hours() {
        let forecast = [1.0, 1.0, 1.0];
        // undiscounted hour 0 dominates: max(1*1, 1*0.9, 1*0.81) = 1.0
        assert!((opportunity_cost(&forecast) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn nash_markup_matches_scenario_s1() {
        let state = state();
        // p_m=0.50, D=20000, N=10 -> mu = 0.3 * min(0.4,1.5) / (10*0.2+1) = 0.3*0.4/3 = 0.04
        let price = nash_price(&state, 0.50, 20000.0, 10);
        assert!((price - 0.52).abs() < 1e-9, "got {price}");
    }

    #[test]
    fn nash_markup_boundary_b2_zero_competitors() {
        let state = state();
        // N=0 -> mu = alpha * min(D/max_grid_demand, 1.5)
        let price = nash_price(&state, 0.50, 20000.0, 0);
        let expected_mu = state.alpha * (20000.0 / state.max_grid_demand).min(1.5);
        assert!((price - 0.50 * (1.0 + expected_mu)).abs() < 1e-9);
    }

    #[test]
    fn nash_demand_ratio_clamped_at_one_point_five() {
        let state = state();
        let price_at_cap = nash_price(&state, 0.50, 1_000_000.0, 10);
        let price_above_cap = nash_price(&state, 0.50, 2_000_000.0, 10);
        assert!((price_at_cap - price_above_cap).abs() < 1e-9);
    }

    #[test]
    fn marginal_cost_treats_non_finite_opportunity_as_zero() {
        let state = state();
        let with_nan = marginal_cost(&state, 14, 0.5, f64::NAN);
        let with_zero = marginal_cost(&state, 14, 0.5, 0.0);
        assert_eq!(with_nan, with_zero);
    }

    #[test]
    fn marginal_cost_is_total_on_full_depth() {
        let state = state();
        let cost = marginal_cost(&state, 14, 1.0, 0.0);
        assert!(cost.is_finite() && cost > 0.0);
    }
}
