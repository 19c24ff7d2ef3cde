use super::{BatteryBus, BatteryBusError};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// A software battery model for development and CI: SOC drifts towards a
/// setpoint implied by the last commanded discharge rate, DR status is
/// externally toggleable. Mirrors the teacher's `SimulatedBattery` shape.
pub struct SimulatedBatteryBus {
    soc: RwLock<f64>,
    temperature_c: RwLock<f64>,
    dr_enabled: RwLock<bool>,
    capacity_kwh: f64,
}

impl SimulatedBatteryBus {
    pub fn new(initial_soc: f64, capacity_kwh: f64) -> Self {
        Self {
            soc: RwLock::new(initial_soc),
            temperature_c: RwLock::new(25.0),
            dr_enabled: RwLock::new(false),
            capacity_kwh,
        }
    }
}

#[async_trait]
impl BatteryBus for SimulatedBatteryBus {
    async fn read_soc(&self) -> anyhow::Result<f64> {
        Ok(*self.soc.read().await)
    }

    async fn read_temperature_c(&self) -> anyhow::Result<f64> {
        Ok(*self.temperature_c.read().await)
    }

    async fn read_dr_status(&self) -> anyhow::Result<bool> {
        Ok(*self.dr_enabled.read().await)
    }

    async fn write_dr_enable(&self, enabled: bool) -> anyhow::Result<()> {
        *self.dr_enabled.write().await = enabled;
        Ok(())
    }

    async fn write_discharge_rate(&self, rate: i64) -> anyhow::Result<()> {
        // rate is capacity_kwh * 100 (spec.md §6 register convention)
        let delta_kwh = rate as f64 / 100.0;
        let mut soc = self.soc.write().await;
        *soc = (*soc - delta_kwh / self.capacity_kwh).clamp(0.0, 1.0);
        Ok(())
    }
}

/// A pre-scripted sequence of readings for deterministic tests, following
/// the teacher's `MockBattery` pattern: each call to `read_soc`/
/// `read_temperature_c`/`read_dr_status` pops the next scripted value,
/// falling back to the last value once the script is exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedReading {
    pub soc: f64,
    pub temperature_c: f64,
    pub dr_status: bool,
}

pub struct ScriptedBatteryBus {
    script: RwLock<VecDeque<ScriptedReading>>,
    last: RwLock<ScriptedReading>,
    pub written_rates: RwLock<Vec<i64>>,
    pub dr_enable_writes: RwLock<Vec<bool>>,
    pub fail_next_read: RwLock<bool>,
}

impl ScriptedBatteryBus {
    pub fn new(readings: impl IntoIterator<Item = ScriptedReading>) -> Self {
        let script: VecDeque<ScriptedReading> = readings.into_iter().collect();
        let last = script.front().cloned().unwrap_or(ScriptedReading {
            soc: 0.5,
            temperature_c: 25.0,
            dr_status: false,
        });
        Self {
            script: RwLock::new(script),
            last: RwLock::new(last),
            written_rates: RwLock::new(Vec::new()),
            dr_enable_writes: RwLock::new(Vec::new()),
            fail_next_read: RwLock::new(false),
        }
    }

    async fn next(&self) -> ScriptedReading {
        let mut script = self.script.write().await;
        if let Some(reading) = script.pop_front() {
            *self.last.write().await = reading.clone();
            reading
        } else {
            self.last.read().await.clone()
        }
    }
}

#[async_trait]
impl BatteryBus for ScriptedBatteryBus {
    async fn read_soc(&self) -> anyhow::Result<f64> {
        if *self.fail_next_read.read().await {
            *self.fail_next_read.write().await = false;
            return Err(BatteryBusError::Offline.into());
        }
        Ok(self.next().await.soc)
    }

    async fn read_temperature_c(&self) -> anyhow::Result<f64> {
        Ok(self.last.read().await.temperature_c)
    }

    async fn read_dr_status(&self) -> anyhow::Result<bool> {
        Ok(self.last.read().await.dr_status)
    }

    async fn write_dr_enable(&self, enabled: bool) -> anyhow::Result<()> {
        self.dr_enable_writes.write().await.push(enabled);
        Ok(())
    }

    async fn write_discharge_rate(&self, rate: i64) -> anyhow::Result<()> {
        self.written_rates.write().await.push(rate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_bus_discharges_soc_on_write() {
        let bus = SimulatedBatteryBus::new(0.8, 6.5);
        bus.write_discharge_rate(20).await.unwrap(); // 0.2 kWh
        let soc = bus.read_soc().await.unwrap();
        assert!(soc < 0.8);
    }

    #[tokio::test]
    async fn scripted_bus_replays_readings_then_holds_last() {
        let bus = ScriptedBatteryBus::new([
            ScriptedReading { soc: 0.8, temperature_c: 25.0, dr_status: true },
            ScriptedReading { soc: 0.6, temperature_c: 26.0, dr_status: true },
        ]);
        assert_eq!(bus.read_soc().await.unwrap(), 0.8);
        assert_eq!(bus.read_soc().await.unwrap(), 0.6);
        assert_eq!(bus.read_soc().await.unwrap(), 0.6);
    }

    #[tokio::test]
    async fn scripted_bus_can_simulate_a_single_read_failure() {
        let bus = ScriptedBatteryBus::new([ScriptedReading { soc: 0.5, temperature_c: 25.0, dr_status: false }]);
        *bus.fail_next_read.write().await = true;
        assert!(bus.read_soc().await.is_err());
        assert!(bus.read_soc().await.is_ok());
    }
}
