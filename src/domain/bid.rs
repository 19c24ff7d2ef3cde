use serde::{Deserialize, Serialize};

/// Result of the fast-dispatch bidding calculation (C3).
///
/// Invariant I4: `capacity_kwh == 0.0` implies `price == 0.0` and vice
/// versa — a zero-capacity bid is a declined participation, never priced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FastDispatchBid {
    pub capacity_kwh: f64,
    pub price: f64,
}

impl FastDispatchBid {
    pub fn decline() -> Self {
        Self { capacity_kwh: 0.0, price: 0.0 }
    }

    pub fn is_participating(&self) -> bool {
        self.capacity_kwh > 0.0
    }
}

/// Result of the day-ahead capacity-allocation calculation (C3), one entry
/// per hour of the day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayAheadAllocation {
    pub capacity_kwh: [f64; 24],
    pub price: [f64; 24],
}

impl DayAheadAllocation {
    pub fn total_capacity_kwh(&self) -> f64 {
        self.capacity_kwh.iter().sum()
    }
}
