//! Module, pin and register-space types.
//!
//! `ModuleType` maps descriptor tokens like `"REL"` to a closed enum.
//! `PinIdentity` names one physical pin slot on the module stack and is the
//! key of every address table and of pin ownership.

use core::fmt;
use core::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::{AIO_BITS_PER_CHANNEL, AIO_CHANNELS_PER_MODULE, MAX_MODULE_SLOTS};

// ─── ModuleType ─────────────────────────────────────────────────────

/// Kind of module a pin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum ModuleType {
    /// Temperature module.
    Tmp = 0,
    /// Relay module.
    Rel = 1,
    /// PWM module.
    Pwm = 2,
    /// Analog I/O module.
    Aio = 3,
    /// The carrier board itself (onboard GPIO and config registers).
    Leaflet = 4,
    /// Carrier-board GPIO, addressed through the `Leaflet` tables.
    Gpio = 5,
    /// Sentinel for an unrecognised descriptor token. Never operational.
    Error = 6,
}

impl ModuleType {
    /// Module types whose presence is reported by a bitmask register.
    pub const PROBED: [ModuleType; 4] = [Self::Tmp, Self::Rel, Self::Pwm, Self::Aio];

    /// Resolve a descriptor token. Unknown tokens resolve to [`ModuleType::Error`].
    pub fn from_token(token: &str) -> Self {
        token.parse().unwrap_or(Self::Error)
    }

    /// Upper-case token used in descriptors and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tmp => "TMP",
            Self::Rel => "REL",
            Self::Pwm => "PWM",
            Self::Aio => "AIO",
            Self::Leaflet => "LEAFLET",
            Self::Gpio => "GPIO",
            Self::Error => "ERROR",
        }
    }

    /// Whether a claim on this type must be backed by a presence bit.
    pub fn requires_presence(&self) -> bool {
        !matches!(self, Self::Gpio)
    }

    /// Number of module slots the hardware offers for this type.
    ///
    /// `None` for types that are not hot-pluggable modules.
    pub fn max_modules(&self) -> Option<u8> {
        match self {
            Self::Tmp => Some(3),
            Self::Rel => Some(4),
            Self::Pwm => Some(MAX_MODULE_SLOTS),
            Self::Aio => Some(7),
            Self::Leaflet | Self::Gpio | Self::Error => None,
        }
    }

    /// Position of the carrier-board input register holding this type's
    /// presence bitmask (`LEAFLET/0/<position>`).
    pub fn presence_register_position(&self) -> Option<u8> {
        match self {
            Self::Pwm => Some(8),
            Self::Rel => Some(9),
            Self::Tmp => Some(10),
            Self::Aio => Some(11),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TMP" => Ok(Self::Tmp),
            "REL" => Ok(Self::Rel),
            "PWM" => Ok(Self::Pwm),
            "AIO" => Ok(Self::Aio),
            "LEAFLET" => Ok(Self::Leaflet),
            "GPIO" => Ok(Self::Gpio),
            // ERROR is a sentinel, not something a descriptor may name.
            _ => Err(format!("unknown ModuleType: {s:?}")),
        }
    }
}

/// 1-based module number; the carrier board uses 0.
pub type ModuleNumber = u8;

// ─── ModuleSlots ────────────────────────────────────────────────────

bitflags! {
    /// Presence bitmask: bit *k* set iff module *k+1* is installed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModuleSlots: u16 {
        /// Module 1.
        const SLOT_1 = 1 << 0;
        /// Module 2.
        const SLOT_2 = 1 << 1;
        /// Module 3.
        const SLOT_3 = 1 << 2;
        /// Module 4.
        const SLOT_4 = 1 << 3;
        /// Module 5.
        const SLOT_5 = 1 << 4;
        /// Module 6.
        const SLOT_6 = 1 << 5;
        /// Module 7.
        const SLOT_7 = 1 << 6;
        /// Module 8.
        const SLOT_8 = 1 << 7;
    }
}

impl ModuleSlots {
    /// Slot flag for a 1-based module number, `None` outside `1..=8`.
    pub fn for_module(module: u8) -> Option<Self> {
        if (1..=MAX_MODULE_SLOTS).contains(&module) {
            Some(Self::from_bits_retain(1 << (module - 1)))
        } else {
            None
        }
    }

    /// Whether module `module` (1-based) is flagged.
    pub fn has_module(&self, module: u8) -> bool {
        Self::for_module(module).is_some_and(|slot| self.contains(slot))
    }
}

// ─── PinIdentity ────────────────────────────────────────────────────

/// One physical pin slot: `(type, module number, position)`.
///
/// Ordered by type, module, position so tables keyed by it iterate
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinIdentity {
    /// Module type.
    pub module_type: ModuleType,
    /// Module number as printed on the module (carrier board uses 0).
    pub module: u8,
    /// Pin position on the module (configuration registers use 0).
    pub position: u8,
}

impl PinIdentity {
    /// Create a pin identity.
    pub const fn new(module_type: ModuleType, module: u8, position: u8) -> Self {
        Self {
            module_type,
            module,
            position,
        }
    }

    /// Identity of a module's configuration register (position 0).
    pub const fn configuration(module_type: ModuleType, module: u8) -> Self {
        Self::new(module_type, module, 0)
    }

    /// Identity of a carrier-board register.
    pub const fn board(position: u8) -> Self {
        Self::new(ModuleType::Leaflet, 0, position)
    }
}

impl fmt::Display for PinIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.module_type, self.module, self.position)
    }
}

// ─── AddressSpace ───────────────────────────────────────────────────

/// The four disjoint register spaces of the field bus.
///
/// Declaration order equals descriptor group order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum AddressSpace {
    /// Read/write single-bit outputs.
    DiscreteOutputCoil = 0,
    /// Read-only single-bit inputs.
    DiscreteInputContact = 1,
    /// Read-only 16-bit input registers.
    AnalogInputRegister = 2,
    /// Read/write 16-bit holding registers.
    AnalogOutputHoldingRegister = 3,
}

impl AddressSpace {
    /// All spaces in descriptor group order.
    pub const ALL: [AddressSpace; 4] = [
        Self::DiscreteOutputCoil,
        Self::DiscreteInputContact,
        Self::AnalogInputRegister,
        Self::AnalogOutputHoldingRegister,
    ];

    /// Descriptor group index of this space.
    pub fn group(&self) -> usize {
        *self as usize
    }

    /// Space for a descriptor group index.
    pub fn from_group(group: usize) -> Option<Self> {
        Self::ALL.get(group).copied()
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiscreteOutputCoil => write!(f, "discrete output coil"),
            Self::DiscreteInputContact => write!(f, "discrete input contact"),
            Self::AnalogInputRegister => write!(f, "analog input register"),
            Self::AnalogOutputHoldingRegister => write!(f, "analog output holding register"),
        }
    }
}

// ─── AIO ────────────────────────────────────────────────────────────

/// Which side of an AIO channel a caller wants to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AioDirection {
    /// Measured value (analog input register).
    Input,
    /// Set-point (analog output holding register).
    Output,
}

/// Function of an AIO channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AioMode {
    /// 0-10 V output.
    #[serde(rename = "10V_out")]
    VoltageOut = 1,
    /// 0-10 V input.
    #[serde(rename = "10V_in")]
    VoltageIn = 2,
    /// 0-20 mA output.
    #[serde(rename = "0-20mA_out")]
    Current0To20Out = 3,
    /// 0-20 mA input.
    #[serde(rename = "0-20mA_in")]
    Current0To20In = 4,
    /// 4-20 mA output.
    #[serde(rename = "4-20mA_out")]
    Current4To20Out = 5,
    /// 4-20 mA input.
    #[serde(rename = "4-20mA_in")]
    Current4To20In = 6,
    /// Temperature sensor input.
    #[serde(rename = "Temp_in")]
    TemperatureIn = 7,
    /// Digital input.
    #[serde(rename = "Digital_in")]
    DigitalIn = 8,
}

impl AioMode {
    /// Code written into the channel nibble.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether the channel is read (input) rather than driven.
    pub fn direction(&self) -> AioDirection {
        match self {
            Self::VoltageOut | Self::Current0To20Out | Self::Current4To20Out => {
                AioDirection::Output
            }
            _ => AioDirection::Input,
        }
    }

    /// Bit offset of a channel's nibble in the module configuration word.
    ///
    /// `None` for positions outside `1..=4`.
    pub fn channel_shift(position: u8) -> Option<u32> {
        if (1..=AIO_CHANNELS_PER_MODULE).contains(&position) {
            Some(u32::from(AIO_BITS_PER_CHANNEL) * u32::from(position - 1))
        } else {
            None
        }
    }
}

impl FromStr for AioMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "10V_out" => Ok(Self::VoltageOut),
            "10V_in" => Ok(Self::VoltageIn),
            "0-20mA_out" => Ok(Self::Current0To20Out),
            "0-20mA_in" => Ok(Self::Current0To20In),
            "4-20mA_out" => Ok(Self::Current4To20Out),
            "4-20mA_in" => Ok(Self::Current4To20In),
            "Temp_in" => Ok(Self::TemperatureIn),
            "Digital_in" => Ok(Self::DigitalIn),
            _ => Err(format!("unknown AioMode: {s:?}")),
        }
    }
}

// ─── State enums ────────────────────────────────────────────────────

/// Configuration-mode state of the carrier board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigModeState {
    /// Normal operation. Safe to shut down.
    #[default]
    Idle,
    /// Board accepts protected settings; must be left before shutdown.
    ConfigPending,
}

/// Outcome of the firmware compatibility probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompatibilityStatus {
    /// No successful probe yet. Gates treat this as incompatible.
    #[default]
    Unknown,
    /// Firmware at or above the minimum version.
    Compatible,
    /// Firmware below the minimum version.
    Incompatible,
}
