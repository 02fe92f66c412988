//! Immutable register lookup.
//!
//! Built once at startup by [`AddressMapBuilder`](super::AddressMapBuilder).
//! Immutable after construction and shared via `Arc` without locking.

use std::collections::BTreeMap;

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{AddressSpace, AioDirection, ModuleType, PinIdentity};
use leaflet_common::consts::REGISTER_SPACE_COUNT;

/// Position of the carrier board's shared configuration register.
const CONFIG_MODE_POSITION: u8 = 0;

/// Four tables, one per [`AddressSpace`], of pin → physical register address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressMap {
    tables: [BTreeMap<PinIdentity, u16>; REGISTER_SPACE_COUNT],
}

impl AddressMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the address it replaced.
    pub(crate) fn insert(
        &mut self,
        space: AddressSpace,
        pin: PinIdentity,
        address: u16,
    ) -> Option<u16> {
        self.tables[space.group()].insert(pin, address)
    }

    /// All entries of one space, ordered by pin.
    pub fn table(&self, space: AddressSpace) -> &BTreeMap<PinIdentity, u16> {
        &self.tables[space.group()]
    }

    /// Total number of entries across all spaces.
    pub fn len(&self) -> usize {
        self.tables.iter().map(BTreeMap::len).sum()
    }

    /// Whether no space has any entry.
    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(BTreeMap::is_empty)
    }

    /// Physical address of `pin` in `space`.
    pub fn resolve(&self, pin: PinIdentity, space: AddressSpace) -> Result<u16, BspError> {
        self.tables[space.group()]
            .get(&pin)
            .copied()
            .ok_or(BspError::UnknownAddress { pin, space })
    }

    /// Address of the pin's primary function, chosen by its module type.
    ///
    /// | Type | Space                                  |
    /// |------|----------------------------------------|
    /// | TMP  | analog input register                  |
    /// | REL  | discrete output coil                   |
    /// | PWM  | analog output holding register         |
    /// | GPIO | discrete input contact, under LEAFLET  |
    pub fn resolve_for_type(&self, pin: PinIdentity) -> Result<u16, BspError> {
        match pin.module_type {
            ModuleType::Tmp => self.resolve(pin, AddressSpace::AnalogInputRegister),
            ModuleType::Rel => self.resolve(pin, AddressSpace::DiscreteOutputCoil),
            ModuleType::Pwm => self.resolve(pin, AddressSpace::AnalogOutputHoldingRegister),
            ModuleType::Gpio => self.resolve(
                PinIdentity::new(ModuleType::Leaflet, pin.module, pin.position),
                AddressSpace::DiscreteInputContact,
            ),
            module_type => Err(BspError::UnsupportedModuleType { module_type }),
        }
    }

    /// Value register of an AIO channel for the given direction.
    pub fn resolve_aio(&self, pin: PinIdentity, direction: AioDirection) -> Result<u16, BspError> {
        if pin.module_type != ModuleType::Aio {
            return Err(BspError::UnsupportedModuleType {
                module_type: pin.module_type,
            });
        }
        let space = match direction {
            AioDirection::Input => AddressSpace::AnalogInputRegister,
            AioDirection::Output => AddressSpace::AnalogOutputHoldingRegister,
        };
        self.resolve(pin, space)
    }

    /// Inversion coil of a PWM output.
    pub fn pwm_inversion_address(&self, module: u8, position: u8) -> Result<u16, BspError> {
        self.resolve(
            PinIdentity::new(ModuleType::Pwm, module, position),
            AddressSpace::DiscreteOutputCoil,
        )
    }

    /// Per-module configuration holding register (position 0).
    pub fn configuration_register(
        &self,
        module_type: ModuleType,
        module: u8,
    ) -> Result<u16, BspError> {
        self.resolve(
            PinIdentity::configuration(module_type, module),
            AddressSpace::AnalogOutputHoldingRegister,
        )
    }

    /// Shared carrier-board register driving configuration mode.
    pub fn config_mode_register(&self) -> Result<u16, BspError> {
        self.resolve(
            PinIdentity::board(CONFIG_MODE_POSITION),
            AddressSpace::AnalogOutputHoldingRegister,
        )
    }

    /// Carrier-board input register holding the presence bitmask of `module_type`.
    pub fn presence_register(&self, module_type: ModuleType) -> Result<u16, BspError> {
        let position = module_type
            .presence_register_position()
            .ok_or(BspError::UnsupportedModuleType { module_type })?;
        self.resolve(
            PinIdentity::board(position),
            AddressSpace::AnalogInputRegister,
        )
    }
}
