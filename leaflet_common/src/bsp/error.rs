//! Error taxonomy of the Leaflet core.
//!
//! Startup errors (`Configuration`, `Compatibility`) abort activation of the
//! board instance. Per-pin errors are returned to the requesting client only
//! and never affect pins other clients already own.

use thiserror::Error;

use crate::bsp::bus::BusError;
use crate::bsp::types::{AddressSpace, ModuleType, PinIdentity};

/// Errors returned by the Leaflet core and its client drivers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BspError {
    /// The address-map descriptor or board configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The board firmware is below the minimum version or could not be probed.
    #[error("firmware incompatible: {0}")]
    Compatibility(String),

    /// The requested module type has no register mapping for this operation.
    #[error("unsupported module type {module_type}")]
    UnsupportedModuleType {
        /// Offending module type.
        module_type: ModuleType,
    },

    /// No register is mapped for the pin in the requested space.
    #[error("no {space} mapped for {pin}")]
    UnknownAddress {
        /// Requested pin.
        pin: PinIdentity,
        /// Requested address space.
        space: AddressSpace,
    },

    /// The pin is already owned by another claimant.
    #[error("pin {pin} is already owned by '{owner}'")]
    AllocationConflict {
        /// Requested pin.
        pin: PinIdentity,
        /// Current owner.
        owner: String,
    },

    /// The module carrying the pin is not physically installed.
    #[error("module {module_type} {module} is not present (pin {pin})")]
    ModuleNotPresent {
        /// Module type.
        module_type: ModuleType,
        /// Module number.
        module: u8,
        /// Requested pin.
        pin: PinIdentity,
    },

    /// A protected setting is out of range.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    /// A bus transaction failed where the caller must know about it.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

impl BspError {
    /// Whether this error must abort activation of the board.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Compatibility(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_names_pin_and_owner() {
        let err = BspError::AllocationConflict {
            pin: PinIdentity::new(ModuleType::Rel, 2, 3),
            owner: "relay0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("REL/2/3"));
        assert!(msg.contains("relay0"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn startup_errors_are_fatal() {
        assert!(BspError::Configuration("x".into()).is_fatal());
        assert!(BspError::Compatibility("x".into()).is_fatal());
        assert!(!BspError::InvalidSetting("x".into()).is_fatal());
    }

    #[test]
    fn bus_error_converts() {
        let err: BspError = BusError::Timeout { address: 1 }.into();
        assert!(matches!(err, BspError::Bus(BusError::Timeout { address: 1 })));
    }
}
