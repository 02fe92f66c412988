//! In-process carrier board emulation.
//!
//! The `SimulationBus` implements `RegisterBus` with four plain register
//! banks. Holding registers echo what was written, which is what the real
//! board does once a protected setting has been applied. Presence bitmasks
//! and other input values are preset from `[bus_config.simulation]`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use leaflet_common::bsp::bus::{BusError, RegisterBus};
use leaflet_common::consts::DEFAULT_MODBUS_UNIT_ID;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, trace};

/// Default banner reported by the simulated base software.
pub const DEFAULT_SIMULATION_BANNER: &str = "Leaflet V78.0 (simulation)";

fn default_banner() -> String {
    DEFAULT_SIMULATION_BANNER.to_string()
}

/// `[bus_config.simulation]` section.
///
/// ```toml
/// [bus_config.simulation]
/// firmware_banner = "Leaflet V78.0 running"
/// input_registers = [[109, 3], [110, 1]]   # [address, value]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Reply of the simulated version probe.
    #[serde(default = "default_banner")]
    pub firmware_banner: String,

    /// Preset input registers as `[address, value]` pairs.
    #[serde(default)]
    pub input_registers: Vec<[u16; 2]>,

    /// Preset discrete inputs as `[address, 0|1]` pairs.
    #[serde(default)]
    pub discrete_inputs: Vec<[u16; 2]>,

    /// Start with every write failing.
    #[serde(default)]
    pub fail_writes: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            firmware_banner: default_banner(),
            input_registers: Vec::new(),
            discrete_inputs: Vec::new(),
            fail_writes: false,
        }
    }
}

#[derive(Debug, Default)]
struct Banks {
    input: HashMap<u16, u16>,
    holding: HashMap<u16, u16>,
    coils: HashMap<u16, bool>,
    contacts: HashMap<u16, bool>,
    /// Every holding write in order, for inspection.
    holding_log: Vec<(u16, u16)>,
    /// Holding registers whose writes are logged but not applied.
    frozen: Vec<u16>,
}

/// Simulated carrier board.
#[derive(Debug)]
pub struct SimulationBus {
    banks: Mutex<Banks>,
    fail_writes: AtomicBool,
    banner: String,
    unit_id: u8,
}

impl SimulationBus {
    /// Bus with the given presets.
    pub fn new(config: &SimulationConfig) -> Self {
        let mut banks = Banks::default();
        banks.input.extend(config.input_registers.iter().map(|[a, v]| (*a, *v)));
        banks
            .contacts
            .extend(config.discrete_inputs.iter().map(|[a, v]| (*a, *v != 0)));
        debug!(
            "Simulation bus: {} input register(s), {} discrete input(s) preset",
            banks.input.len(),
            banks.contacts.len()
        );
        Self {
            banks: Mutex::new(banks),
            fail_writes: AtomicBool::new(config.fail_writes),
            banner: config.firmware_banner.clone(),
            unit_id: DEFAULT_MODBUS_UNIT_ID,
        }
    }

    /// Answer as unit `unit_id` instead of the default.
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Banner the simulated version probe reports.
    pub fn banner(&self) -> &str {
        &self.banner
    }

    /// Set an input register (e.g. a presence bitmask).
    pub fn set_input_register(&self, address: u16, value: u16) {
        self.banks.lock().input.insert(address, value);
    }

    /// Set a discrete input.
    pub fn set_discrete_input(&self, address: u16, value: bool) {
        self.banks.lock().contacts.insert(address, value);
    }

    /// Make every write fail with a timeout.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stop applying writes to a holding register (read-back keeps the old value).
    pub fn freeze_holding_register(&self, address: u16) {
        self.banks.lock().frozen.push(address);
    }

    /// All values written to a holding register, oldest first.
    pub fn holding_writes(&self, address: u16) -> Vec<u16> {
        self.banks
            .lock()
            .holding_log
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Current coil value.
    pub fn coil(&self, address: u16) -> bool {
        self.banks.lock().coils.get(&address).copied().unwrap_or(false)
    }

    fn check_write(&self, address: u16) -> Result<(), BusError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(BusError::Timeout { address })
        } else {
            Ok(())
        }
    }
}

impl Default for SimulationBus {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

impl RegisterBus for SimulationBus {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn unit_id(&self) -> u8 {
        self.unit_id
    }

    fn read_input_register(&self, address: u16) -> Result<u16, BusError> {
        Ok(self.banks.lock().input.get(&address).copied().unwrap_or(0))
    }

    fn read_holding_register(&self, address: u16) -> Result<u16, BusError> {
        Ok(self.banks.lock().holding.get(&address).copied().unwrap_or(0))
    }

    fn write_holding_register(&self, address: u16, value: u16) -> Result<(), BusError> {
        self.check_write(address)?;
        let mut banks = self.banks.lock();
        trace!("sim holding[{address}] <- {value}");
        banks.holding_log.push((address, value));
        if !banks.frozen.contains(&address) {
            banks.holding.insert(address, value);
        }
        Ok(())
    }

    fn read_coil(&self, address: u16) -> Result<bool, BusError> {
        Ok(self.coil(address))
    }

    fn write_coil(&self, address: u16, value: bool) -> Result<(), BusError> {
        self.check_write(address)?;
        trace!("sim coil[{address}] <- {value}");
        self.banks.lock().coils.insert(address, value);
        Ok(())
    }

    fn read_discrete_input(&self, address: u16) -> Result<bool, BusError> {
        Ok(self
            .banks
            .lock()
            .contacts
            .get(&address)
            .copied()
            .unwrap_or(false))
    }
}
