//! Bus backends.
//!
//! - [`simulation`] - In-process carrier board emulation
//!
//! # Adding a Backend
//!
//! 1. Create a submodule implementing `RegisterBus`
//! 2. Expose a `create_bus` function matching `BusFactory`
//! 3. Register it in [`register_builtin_buses`]

pub mod simulation;

use leaflet_common::bsp::error::BspError;

use crate::bus_registry::BusRegistry;

/// Register all built-in backends.
pub fn register_builtin_buses(registry: &mut BusRegistry) -> Result<(), BspError> {
    registry.register(simulation::NAME, simulation::create_bus)
}
