use super::simulated::SimulatedBatteryBus;
use super::BatteryBus;
use crate::config::HardwareMode;
use std::sync::Arc;
use tracing::{info, warn};

/// Selects a `BatteryBus` implementation from configuration, mirroring the
/// teacher's `hardware::factory::DeviceFactory`.
pub struct BatteryBusFactory {
    mode: HardwareMode,
}

impl BatteryBusFactory {
    pub fn new(mode: HardwareMode) -> Self {
        Self { mode }
    }

    pub async fn create(&self, initial_soc: f64, capacity_kwh: f64, modbus_addr: Option<&str>, modbus_unit_id: u8) -> Arc<dyn BatteryBus> {
        match self.mode {
            HardwareMode::Simulated | HardwareMode::Mock => {
                Arc::new(SimulatedBatteryBus::new(initial_soc, capacity_kwh))
            }
            HardwareMode::Modbus => {
                #[cfg(feature = "modbus")]
                {
                    if let Some(addr) = modbus_addr {
                        match super::modbus::ModbusBatteryBus::connect(addr, modbus_unit_id).await {
                            Ok(bus) => {
                                info!(%addr, "connected to battery bus via Modbus");
                                return Arc::new(bus);
                            }
                            Err(e) => {
                                warn!(error = %e, "failed to connect to Modbus battery bus, falling back to simulated");
                            }
                        }
                    } else {
                        warn!("hardware mode is Modbus but no address configured, falling back to simulated");
                    }
                }
                #[cfg(not(feature = "modbus"))]
                {
                    warn!("modbus feature not compiled in, falling back to simulated battery bus");
                }
                Arc::new(SimulatedBatteryBus::new(initial_soc, capacity_kwh))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_mode_yields_working_bus() {
        let factory = BatteryBusFactory::new(HardwareMode::Simulated);
        let bus = factory.create(0.5, 6.5, None, 1).await;
        assert_eq!(bus.read_soc().await.unwrap(), 0.5);
    }
}
