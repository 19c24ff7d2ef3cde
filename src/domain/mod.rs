pub mod bid;
pub mod forecast;
pub mod ledger;
pub mod strategy;

pub use bid::{DayAheadAllocation, FastDispatchBid};
pub use forecast::ForecastSnapshot;
pub use ledger::{degradation_cost_per_kwh, CycleRecord, RainflowLedger, MIN_RECORDABLE_DEPTH};
pub use strategy::{StrategyConfigError, StrategyState};
