//! Simulation bus backend.
//!
//! Emulates the carrier board for development and tests without hardware.

mod bus;

pub use bus::{DEFAULT_SIMULATION_BANNER, SimulationBus, SimulationConfig};

use std::sync::Arc;

use leaflet_common::bsp::bus::RegisterBus;
use leaflet_common::bsp::config::BspConfig;
use leaflet_common::bsp::error::BspError;

/// Backend name used in configuration and the registry.
pub const NAME: &str = "simulation";

/// Read `[bus_config.simulation]`, defaults when absent.
pub fn simulation_config(config: &BspConfig) -> Result<SimulationConfig, BspError> {
    match config.bus_section(NAME) {
        Some(section) => section.clone().try_into().map_err(|e| {
            BspError::Configuration(format!("[bus_config.{NAME}] is invalid: {e}"))
        }),
        None => Ok(SimulationConfig::default()),
    }
}

/// Factory registered under [`NAME`].
pub fn create_bus(config: &BspConfig) -> Result<Arc<dyn RegisterBus>, BspError> {
    let bus = SimulationBus::new(&simulation_config(config)?)
        .with_unit_id(config.board.modbus_unit_id);
    Ok(Arc::new(bus))
}
