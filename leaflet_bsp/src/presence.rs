//! Module presence detection.
//!
//! The carrier board reports which modules are plugged in through four
//! bitmask input registers, one per module type. A [`PresenceSnapshot`] is
//! the decoded state of those registers; [`PresenceProbe`] reads them.

use leaflet_common::bsp::bus::RegisterBus;
use leaflet_common::bsp::types::{ModuleSlots, ModuleType};
use tracing::{debug, warn};

use crate::address_map::AddressMap;

/// Decoded presence bitmasks. Empty (nothing present) until the first probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceSnapshot {
    tmp: ModuleSlots,
    rel: ModuleSlots,
    pwm: ModuleSlots,
    aio: ModuleSlots,
}

impl PresenceSnapshot {
    /// Bitmask for a probed type; empty for all others.
    pub fn slots(&self, module_type: ModuleType) -> ModuleSlots {
        match module_type {
            ModuleType::Tmp => self.tmp,
            ModuleType::Rel => self.rel,
            ModuleType::Pwm => self.pwm,
            ModuleType::Aio => self.aio,
            _ => ModuleSlots::empty(),
        }
    }

    /// Replace the bitmask of a probed type. Other types are ignored.
    pub fn set(&mut self, module_type: ModuleType, slots: ModuleSlots) {
        match module_type {
            ModuleType::Tmp => self.tmp = slots,
            ModuleType::Rel => self.rel = slots,
            ModuleType::Pwm => self.pwm = slots,
            ModuleType::Aio => self.aio = slots,
            _ => {}
        }
    }

    /// Builder-style [`set`](Self::set) from a raw register value.
    pub fn with_bits(mut self, module_type: ModuleType, bits: u16) -> Self {
        self.set(module_type, ModuleSlots::from_bits_retain(bits));
        self
    }

    /// Whether module `module` of `module_type` is installed.
    ///
    /// GPIO is always present. LEAFLET and ERROR are never claimable modules.
    /// Numbers outside `1..=max_modules` are never present.
    pub fn is_present(&self, module_type: ModuleType, module: u8) -> bool {
        match module_type {
            ModuleType::Gpio => true,
            ModuleType::Leaflet | ModuleType::Error => false,
            _ => match module_type.max_modules() {
                Some(max) if (1..=max).contains(&module) => {
                    self.slots(module_type).has_module(module)
                }
                _ => false,
            },
        }
    }
}

/// Reads the presence registers of the carrier board.
#[derive(Debug, Clone)]
pub struct PresenceProbe {
    registers: Vec<(ModuleType, u16)>,
}

impl PresenceProbe {
    /// Resolve the presence registers from the address map.
    ///
    /// Types without a mapped register are never reported present.
    pub fn new(map: &AddressMap) -> Self {
        let mut registers = Vec::with_capacity(ModuleType::PROBED.len());
        for module_type in ModuleType::PROBED {
            match map.presence_register(module_type) {
                Ok(address) => registers.push((module_type, address)),
                Err(e) => warn!("No presence register for {module_type}: {e}"),
            }
        }
        Self { registers }
    }

    /// Number of presence registers that will be read.
    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    /// Read all presence registers. A failed read keeps the previous value.
    pub fn read(&self, bus: &dyn RegisterBus, previous: &PresenceSnapshot) -> PresenceSnapshot {
        let mut snapshot = *previous;
        for &(module_type, address) in &self.registers {
            match bus.read_input_register(address) {
                Ok(bits) => snapshot.set(module_type, ModuleSlots::from_bits_retain(bits)),
                Err(e) => debug!("Presence read for {module_type} failed, keeping last value: {e}"),
            }
        }
        snapshot
    }
}
