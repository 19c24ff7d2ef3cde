//! Fast-dispatch bid and day-ahead capacity allocation (C3).

use crate::domain::{DayAheadAllocation, FastDispatchBid, ForecastSnapshot, StrategyState};
use crate::economics;

const DAY_AHEAD_CONCENTRATION: f64 = 2.0;
const PEAK_REVENUE_MULTIPLIER: f64 = 1.2;
const OFF_PEAK_REVENUE_MULTIPLIER: f64 = 1.0;
const PEAK_PRICE_MARKUP: f64 = 0.15;
const OFF_PEAK_PRICE_MARKUP: f64 = 0.05;
const PEAK_MC_MARKUP: f64 = 0.20;
const OFF_PEAK_MC_MARKUP: f64 = 0.10;

/// A rotation of the 24-hour price vector starting at `start_hour`, used to
/// compute the opportunity cost "from now" for an arbitrary hour, per
/// spec.md §4.3 step 3/5 ("local forecast from now" / "cyclic rotation").
fn rotate_from(prices: &[f64; 24], start_hour: usize) -> Vec<f64> {
    let start = start_hour % 24;
    prices[start..].iter().chain(prices[..start].iter()).copied().collect()
}

/// Fast-dispatch bid calculation, spec.md §4.3.
///
/// `current_hour` is the local hour (0-23) used both for the marginal-cost
/// base rate and as the rotation point for the opportunity-cost lookahead.
pub fn fast_dispatch_bid(
    state: &StrategyState,
    forecast: &ForecastSnapshot,
    market_price: f64,
    grid_demand: f64,
    window_hours: f64,
    num_competitors: u32,
    current_hour: u32,
) -> FastDispatchBid {
    let available_kwh = state.available_kwh();
    let delta = available_kwh / state.battery_capacity_kwh;

    let lookahead = rotate_from(&forecast.price_forecast, current_hour as usize);
    let o = economics::opportunity_cost(&lookahead);
    let mc = economics::marginal_cost(state, current_hour, delta, o);
    let p_nash = economics::nash_price(state, market_price, grid_demand, num_competitors);

    if p_nash > mc {
        let capacity_kwh = available_kwh.min(state.battery_capacity_kwh * window_hours * state.round_trip_efficiency);
        FastDispatchBid { capacity_kwh, price: p_nash }
    } else {
        FastDispatchBid::decline()
    }
}

/// Day-ahead capacity allocation, spec.md §4.3.
///
/// `peak_mask` marks hours the utility (or `ForecastSnapshot::derive_peak_mask`
/// as a fallback) considers peak demand hours.
pub fn day_ahead_allocation(
    state: &StrategyState,
    day_ahead_prices: &[f64; 24],
    peak_mask: &[bool; 24],
) -> DayAheadAllocation {
    let mut revenue = [0.0f64; 24];
    for h in 0..24 {
        let multiplier = if peak_mask[h] { PEAK_REVENUE_MULTIPLIER } else { OFF_PEAK_REVENUE_MULTIPLIER };
        revenue[h] = day_ahead_prices[h] * multiplier;
    }

    let mut weights = [0.0f64; 24];
    for h in 0..24 {
        weights[h] = (DAY_AHEAD_CONCENTRATION * revenue[h]).exp();
    }
    let weight_sum: f64 = weights.iter().sum();

    let energy_budget_kwh = state.usable_band_kwh();

    let mut capacity_kwh = [0.0f64; 24];
    let mut price = [0.0f64; 24];
    for h in 0..24 {
        let w = weights[h] / weight_sum;
        capacity_kwh[h] = energy_budget_kwh * w;

        let delta_h = capacity_kwh[h] / state.battery_capacity_kwh;
        let rotated = rotate_from(day_ahead_prices, h);
        let o_h = economics::opportunity_cost(&rotated);
        let mc_h = economics::marginal_cost(state, h as u32, delta_h, o_h);

        let price_markup = if peak_mask[h] { PEAK_PRICE_MARKUP } else { OFF_PEAK_PRICE_MARKUP };
        let mc_markup = if peak_mask[h] { PEAK_MC_MARKUP } else { OFF_PEAK_MC_MARKUP };

        price[h] = (day_ahead_prices[h] * (1.0 + price_markup)).max(mc_h * (1.0 + mc_markup));
    }

    DayAheadAllocation { capacity_kwh, price }
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

    fn flat_forecast(price: f64) -> ForecastSnapshot {
        let mut snap = ForecastSnapshot::empty();
        snap.price_forecast = [price; 24];
        snap.grid_demand_forecast = [20000.0; 24];
        snap.num_competitors = 10;
        snap
    }

    #[test]
    fn scenario_s1_profitable_fast_dispatch() {
        let state = state();
        let forecast = flat_forecast(0.05);
        let bid = fast_dispatch_bid(&state, &forecast, 0.50, 20000.0, 1.0, 10, 14);
        assert!(bid.is_participating());
        assert!(bid.price >= 0.52 - 1e-9);
    }

    #[test]
    fn scenario_s2_unprofitable_refusal() {
        let state = state();
        let forecast = flat_forecast(0.05);
        let bid = fast_dispatch_bid(&state, &forecast, 0.05, 20000.0, 1.0, 10, 14);
        assert_eq!(bid, FastDispatchBid::decline());
    }

    #[test]
    fn boundary_b1_soc_at_floor_declines() {
        let mut state = state();
        state.current_soc = state.min_soc;
        let forecast = flat_forecast(0.05);
        let bid = fast_dispatch_bid(&state, &forecast, 0.50, 20000.0, 1.0, 10, 14);
        assert_eq!(bid, FastDispatchBid::decline());
    }

    #[test]
    fn invariant_i4_zero_capacity_implies_zero_price() {
        let bid = FastDispatchBid::decline();
        assert_eq!(bid.capacity_kwh, 0.0);
        assert_eq!(bid.price, 0.0);
    }

    #[test]
    fn invariant_p3_emitted_bid_price_covers_marginal_cost() {
        let state = state();
        let forecast = flat_forecast(0.05);
        let bid = fast_dispatch_bid(&state, &forecast, 0.50, 20000.0, 1.0, 10, 14);
        assert!(bid.is_participating());
        let delta = state.available_kwh() / state.battery_capacity_kwh;
        let o = economics::opportunity_cost(&rotate_from(&forecast.price_forecast, 14));
        let mc = economics::marginal_cost(&state, 14, delta, o);
        assert!(bid.price >= mc - 1e-9);
    }

    #[test]
    fn scenario_s5_day_ahead_flat_prices_sum_to_usable_band() {
        let state = state();
        let prices = [0.20f64; 24];
        let peak_mask = ForecastSnapshot { price_forecast: prices, ..ForecastSnapshot::empty() }.derive_peak_mask();
        let alloc = day_ahead_allocation(&state, &prices, &peak_mask);
        assert!((alloc.total_capacity_kwh() - 5.2).abs() < 1e-9);
    }

    #[test]
    fn boundary_b4_flat_prices_allocate_uniformly() {
        let state = state();
        let prices = [0.20f64; 24];
        let peak_mask = [false; 24];
        let alloc = day_ahead_allocation(&state, &prices, &peak_mask);
        let expected = state.usable_band_kwh() / 24.0;
        for h in 0..24 {
            assert!((alloc.capacity_kwh[h] - expected).abs() < 1e-9, "hour {h}");
        }
    }

    #[test]
    fn boundary_b3_all_zero_peak_mask_still_allocates_every_hour() {
        let state = state();
        let mut prices = [0.10f64; 24];
        prices[10] = 0.5;
        let peak_mask = [false; 24];
        let alloc = day_ahead_allocation(&state, &prices, &peak_mask);
        assert!(alloc.capacity_kwh.iter().all(|&c| c > 0.0));
    }

    #[test]
    fn round_trip_r1_weights_sum_to_one() {
        // indirectly verified via total_capacity_kwh == usable_band_kwh,
        // since capacity[h] = budget * w[h] and sum(w) must equal 1.0
        let state = state();
        let mut prices = [0.1f64; 24];
        for (h, p) in prices.iter_mut().enumerate() {
            *p += h as f64 * 0.01;
        }
        let peak_mask = [false; 24];
        let alloc = day_ahead_allocation(&state, &prices, &peak_mask);
        assert!((alloc.total_capacity_kwh() - state.usable_band_kwh()).abs() < 1e-9);
    }
}
