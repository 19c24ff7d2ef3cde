pub mod factory;
pub mod modbus;
pub mod simulated;

use async_trait::async_trait;
use thiserror::Error;

/// Battery-bus specific errors (C4).
#[derive(Debug, Error)]
pub enum BatteryBusError {
    #[error("communication error: {0}")]
    Communication(String),
    #[error("register value out of range: {0}")]
    OutOfRange(String),
    #[error("bus offline or unreachable")]
    Offline,
}

/// Abstract capability set over the battery's industrial serial bus (C4).
///
/// Every operation may fail; on failure the caller logs and skips state
/// updates for that tick rather than propagating a hard error (spec.md §7,
/// "Transient I/O"). Implementations must treat NaN/infinite register
/// readings as a failed read, never as a value (spec.md §9).
#[async_trait]
pub trait BatteryBus: Send + Sync {
    /// Raw (unfiltered) state of charge, fraction in [0,1].
    async fn read_soc(&self) -> anyhow::Result<f64>;
    /// Battery temperature in degrees Celsius. Implementations should
    /// default to 25.0 on a failed read rather than propagating an error,
    /// per spec.md §4.4.
    async fn read_temperature_c(&self) -> anyhow::Result<f64>;
    /// Whether the utility DR program is currently signaling active.
    async fn read_dr_status(&self) -> anyhow::Result<bool>;
    /// Enable or disable DR participation at the inverter.
    async fn write_dr_enable(&self, enabled: bool) -> anyhow::Result<()>;
    /// Command a discharge rate, as the scaled integer documented in the
    /// register map (spec.md §6: `capacity * 100`).
    async fn write_discharge_rate(&self, rate: i64) -> anyhow::Result<()>;
}

/// Moving average over the last `WINDOW` raw SOC samples (spec.md §4.4),
/// suppressing single-sample measurement jitter. Initialized to 0.5 in
/// every slot, matching the spec's documented startup default.
const SOC_FILTER_WINDOW: usize = 5;

#[derive(Debug, Clone)]
pub struct SocFilter {
    samples: std::collections::VecDeque<f64>,
}

impl SocFilter {
    pub fn new() -> Self {
        let mut samples = std::collections::VecDeque::with_capacity(SOC_FILTER_WINDOW);
        for _ in 0..SOC_FILTER_WINDOW {
            samples.push_back(0.5);
        }
        Self { samples }
    }

    /// Push a new raw sample and return the filtered (averaged) SOC.
    pub fn push(&mut self, raw_soc: f64) -> f64 {
        if self.samples.len() == SOC_FILTER_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(raw_soc);
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn current(&self) -> f64 {
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

impl Default for SocFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod filter_tests {
    use super::*;

    #[test]
    fn initializes_to_one_half() {
        let filter = SocFilter::new();
        assert_eq!(filter.current(), 0.5);
    }

    #[test]
    fn smooths_a_single_jitter_sample() {
        let mut filter = SocFilter::new();
        // Four 0.5 samples still in the window plus one outlier.
        let filtered = filter.push(0.9);
        assert!((filtered - (0.5 * 4.0 + 0.9) / 5.0).abs() < 1e-12);
    }

    #[test]
    fn converges_to_steady_state_after_window_fills() {
        let mut filter = SocFilter::new();
        let mut last = 0.0;
        for _ in 0..SOC_FILTER_WINDOW {
            last = filter.push(0.8);
        }
        assert!((last - 0.8).abs() < 1e-12);
    }
}
