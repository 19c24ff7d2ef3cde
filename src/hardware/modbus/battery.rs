use super::client::ModbusClient;
use super::parser;
use super::register_map::{BmsRegisterMap, RegisterMap};
use crate::hardware::BatteryBus;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// Modbus-backed implementation of the battery-bus capability (C4).
///
/// Holds one persistent `ModbusClient` connection, constructed once at
/// startup by `hardware::factory::BatteryBusFactory` and reused by every
/// dispatch-controller tick thereafter.
pub struct ModbusBatteryBus {
    client: ModbusClient,
    register_map: Box<dyn RegisterMap>,
}

impl ModbusBatteryBus {
    pub async fn connect(addr: &str, unit_id: u8) -> Result<Self> {
        let client = ModbusClient::connect(addr, unit_id)
            .await
            .context("failed to connect to battery bus")?;
        Ok(Self {
            client,
            register_map: Box::new(BmsRegisterMap),
        })
    }

    pub async fn reconnect(&self) -> Result<()> {
        self.client.reconnect().await
    }
}

#[async_trait]
impl BatteryBus for ModbusBatteryBus {
    async fn read_soc(&self) -> Result<f64> {
        debug!("reading SOC register");
        let regs = self
            .client
            .read_holding_registers(self.register_map.soc_register(), 1)
            .await?;
        parser::parse_scaled_u16(&regs, self.register_map.soc_scale())
    }

    async fn read_temperature_c(&self) -> Result<f64> {
        match self
            .client
            .read_holding_registers(self.register_map.temperature_register(), 1)
            .await
        {
            Ok(regs) => parser::parse_scaled_u16(&regs, self.register_map.temperature_scale()),
            // spec.md §4.4: a failed temperature read defaults to 25.0 rather
            // than aborting the tick.
            Err(_) => Ok(25.0),
        }
    }

    async fn read_dr_status(&self) -> Result<bool> {
        let regs = self
            .client
            .read_holding_registers(self.register_map.dr_enable_register(), 1)
            .await?;
        Ok(parser::parse_u16(&regs) != 0)
    }

    async fn write_dr_enable(&self, enabled: bool) -> Result<()> {
        self.client
            .write_single_register(self.register_map.dr_enable_register(), enabled as u16)
            .await
    }

    async fn write_discharge_rate(&self, rate: i64) -> Result<()> {
        // CRITICAL: i16 range is [-32768, 32767]; an out-of-range rate would
        // wrap and silently reverse the command's polarity on the wire.
        if rate > i16::MAX as i64 || rate < i16::MIN as i64 {
            anyhow::bail!(
                "discharge rate {} exceeds i16 register range [{}, {}]",
                rate,
                i16::MIN,
                i16::MAX
            );
        }
        self.client
            .write_single_register(self.register_map.discharge_rate_register(), rate as u16)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_register_map_addresses_match_spec() {
        let map = BmsRegisterMap;
        assert_eq!(map.soc_register(), 0x208);
        assert_eq!(map.dr_enable_register(), 0x220);
    }
}
