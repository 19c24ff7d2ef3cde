#![allow(dead_code)]
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use validator::Validate;

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,

    #[validate(nested)]
    pub battery: BatteryConfig,

    #[validate(nested)]
    pub hardware: HardwareConfig,

    #[validate(nested)]
    pub market: MarketConfig,

    #[validate(nested)]
    pub transport: TransportConfig,

    #[validate(nested)]
    pub ephemeris: EphemerisConfig,

    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

/// Observability HTTP surface (C7): read-only, never touches the dispatch loop.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub enable_cors: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .context("Failed to parse socket address")
    }
}

/// Physical and economic parameters feeding `StrategyState::new`, spec.md §3/§6.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_battery_config"))]
pub struct BatteryConfig {
    #[validate(range(min = 0.01))]
    pub capacity_kwh: f64,

    #[validate(range(min = 0.01, max = 1.0))]
    pub round_trip_efficiency: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub min_soc: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub max_soc: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub initial_soc: f64,

    #[validate(range(min = 0.0))]
    pub replacement_cost: f64,

    #[serde(default = "default_k_delta_e1")]
    pub k_delta_e1: f64,

    #[serde(default = "default_k_delta_e2")]
    pub k_delta_e2: f64,

    #[serde(default = "default_cycles_to_eol")]
    pub cycles_to_eol: f64,

    #[serde(default = "default_risk_premium")]
    pub risk_premium: f64,

    #[serde(default = "default_alpha")]
    pub alpha: f64,

    #[serde(default = "default_beta")]
    pub beta: f64,

    #[validate(range(min = 0.01))]
    pub max_grid_demand: f64,
}

fn validate_battery_config(config: &BatteryConfig) -> Result<(), validator::ValidationError> {
    if config.min_soc >= config.max_soc {
        let mut err = validator::ValidationError::new("soc_bounds_inverted");
        err.message = Some("min_soc must be less than max_soc".into());
        return Err(err);
    }
    if config.initial_soc < config.min_soc || config.initial_soc > config.max_soc {
        let mut err = validator::ValidationError::new("initial_soc_out_of_bounds");
        err.message = Some("initial_soc must lie within [min_soc, max_soc]".into());
        return Err(err);
    }
    Ok(())
}

/// Battery-bus wiring (C4): which implementation to construct and how to reach it.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct HardwareConfig {
    #[serde(default = "default_hardware_mode")]
    pub mode: HardwareMode,

    #[serde(default)]
    #[validate(nested)]
    pub modbus: Option<ModbusConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HardwareMode {
    Simulated,
    Modbus,
    Mock,
}

/// Modbus transport parameters for the real battery bus, spec.md §6.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ModbusConfig {
    #[validate(length(min = 1))]
    pub address: String,

    #[validate(range(min = 1, max = 247))]
    pub unit_id: u8,

    #[serde(default = "default_modbus_timeout_ms")]
    pub timeout_ms: u64,
}

/// Market data source wiring (C5).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct MarketConfig {
    #[validate(url)]
    pub endpoint: String,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

/// Bid submission transport wiring.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TransportConfig {
    #[validate(url)]
    pub endpoint: String,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

/// Site location, consumed only for log context (local-hour derivation for
/// T3's 02:00 action window comes from the host clock, per SPEC_FULL.md).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct EphemerisConfig {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(length(min = 1))]
    pub timezone: String,
}

/// Structured logging configuration, mirroring the teacher's `telemetry` setup.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_request_timeout_secs() -> u64 {
    30
}
fn default_k_delta_e1() -> f64 {
    crate::domain::strategy::DEFAULT_K_DELTA_E1
}
fn default_k_delta_e2() -> f64 {
    crate::domain::strategy::DEFAULT_K_DELTA_E2
}
fn default_cycles_to_eol() -> f64 {
    crate::domain::strategy::DEFAULT_CYCLES_TO_EOL
}
fn default_risk_premium() -> f64 {
    0.05
}
fn default_alpha() -> f64 {
    crate::domain::strategy::DEFAULT_ALPHA
}
fn default_beta() -> f64 {
    crate::domain::strategy::DEFAULT_BETA
}
fn default_hardware_mode() -> HardwareMode {
    HardwareMode::Simulated
}
fn default_modbus_timeout_ms() -> u64 {
    1000
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from TOML files and environment variables.
    ///
    /// Configuration is loaded in this order (later overrides earlier):
    /// 1. config/default.toml (base configuration)
    /// 2. config/development.toml or config/production.toml (environment-specific)
    /// 3. Environment variables with OEC__ prefix
    pub fn load() -> Result<Self> {
        Self::load_with_env(None)
    }

    pub fn load_with_env(environment: Option<&str>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file("config/default.toml"));

        if let Some(env) = environment {
            let env_file = format!("config/{}.toml", env);
            figment = figment.merge(Toml::file(env_file));
        } else {
            figment = figment.merge(Toml::file("config/development.toml").nested());
        }

        // Override with environment variables (OEC__BATTERY__CAPACITY_KWH -> battery.capacity_kwh)
        figment = figment.merge(Env::prefixed("OEC__").split("__"));

        let config: AppConfig = figment.extract().context("Failed to parse configuration")?;

        config.validate().context("Configuration validation failed")?;

        Ok(config)
    }

    pub fn validate_config(self) -> Result<Self> {
        self.validate().context("Configuration validation failed")?;
        Ok(self)
    }
}

// Kept for parity with the teacher's naming; both names resolve to the same type.
pub type Config = AppConfig;
