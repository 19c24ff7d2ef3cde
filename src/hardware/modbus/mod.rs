pub mod battery;
pub mod client;
pub mod parser;
pub mod register_map;

pub use battery::ModbusBatteryBus;
pub use register_map::{BmsRegisterMap, RegisterMap};
