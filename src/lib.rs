pub mod api;
pub mod config;
pub mod controller;
pub mod domain;
pub mod economics;
pub mod hardware;
pub mod market;
pub mod planner;
pub mod telemetry;
pub mod transport;
