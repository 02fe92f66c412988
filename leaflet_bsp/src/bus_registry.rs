//! Bus backend registry.
//!
//! Maps backend names from `bsp.toml` (`bus = "..."`) to factories.
//! Constructed at startup and passed by reference; there is no global
//! registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use leaflet_common::bsp::bus::{BusFactory, RegisterBus};
use leaflet_common::bsp::config::BspConfig;
use leaflet_common::bsp::error::BspError;
use tracing::info;

use crate::drivers::register_builtin_buses;

/// Registry of available bus backends.
#[derive(Debug, Default)]
pub struct BusRegistry {
    factories: BTreeMap<&'static str, BusFactory>,
}

impl BusRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in backend.
    pub fn with_builtin() -> Result<Self, BspError> {
        let mut registry = Self::new();
        register_builtin_buses(&mut registry)?;
        Ok(registry)
    }

    /// Register a backend factory.
    ///
    /// # Errors
    /// `BspError::Configuration` if the name is taken.
    pub fn register(&mut self, name: &'static str, factory: BusFactory) -> Result<(), BspError> {
        if self.factories.contains_key(name) {
            return Err(BspError::Configuration(format!(
                "bus backend '{name}' is already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Factory registered under `name`.
    pub fn get_factory(&self, name: &str) -> Option<BusFactory> {
        self.factories.get(name).copied()
    }

    /// Create the backend named `name` from `config`.
    ///
    /// # Errors
    /// `BspError::Configuration` for an unknown name, or whatever the
    /// factory reports.
    pub fn create(&self, name: &str, config: &BspConfig) -> Result<Arc<dyn RegisterBus>, BspError> {
        let factory = self.get_factory(name).ok_or_else(|| {
            BspError::Configuration(format!(
                "unknown bus backend '{name}' (available: {})",
                self.list().join(", ")
            ))
        })?;
        let bus = factory(config)?;
        info!("Created bus backend '{}' (unit {})", bus.name(), bus.unit_id());
        Ok(bus)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}
