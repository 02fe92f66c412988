//! Analog I/O channel.

use std::sync::Arc;

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{AioDirection, AioMode, ModuleType, PinIdentity};
use tracing::info;

use crate::allocator::PinClaim;
use crate::core::LeafletCore;

/// One channel of an AIO module in a fixed mode.
#[derive(Debug)]
pub struct AioDevice {
    core: Arc<LeafletCore>,
    claim: PinClaim,
    mode: AioMode,
    register: u16,
}

impl AioDevice {
    /// Claim channel `position` on module `module` and configure its mode.
    pub fn activate(
        core: Arc<LeafletCore>,
        id: &str,
        module: u8,
        position: u8,
        mode: AioMode,
    ) -> Result<Self, BspError> {
        let pin = PinIdentity::new(ModuleType::Aio, module, position);
        let claim = core.claim_pin(pin, id)?;
        let register = core.resolve_aio(pin, mode.direction())?;
        core.set_aio_mode(module, position, mode)?;
        info!("AIO '{id}' active on {pin} as {mode:?} (register {register})");
        Ok(Self {
            core,
            claim,
            mode,
            register,
        })
    }

    /// Claimed pin.
    pub fn pin(&self) -> PinIdentity {
        self.claim.pin()
    }

    /// Configured mode.
    pub fn mode(&self) -> AioMode {
        self.mode
    }

    /// Read an input channel.
    pub fn read(&self) -> Result<u16, BspError> {
        if self.mode.direction() != AioDirection::Input {
            return Err(BspError::InvalidSetting(format!(
                "AIO {} is an output ({:?})",
                self.pin(),
                self.mode
            )));
        }
        Ok(self.core.bus().read_input_register(self.register)?)
    }

    /// Drive an output channel.
    pub fn write(&self, value: u16) -> Result<(), BspError> {
        if self.mode.direction() != AioDirection::Output {
            return Err(BspError::InvalidSetting(format!(
                "AIO {} is an input ({:?})",
                self.pin(),
                self.mode
            )));
        }
        Ok(self
            .core
            .bus()
            .write_holding_register(self.register, value)?)
    }
}
