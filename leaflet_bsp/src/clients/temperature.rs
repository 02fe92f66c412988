//! Temperature input.

use std::sync::Arc;

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{ModuleType, PinIdentity};
use tracing::info;

use crate::allocator::PinClaim;
use crate::core::LeafletCore;

/// One sensor input on a temperature module.
#[derive(Debug)]
pub struct TemperatureSensor {
    core: Arc<LeafletCore>,
    claim: PinClaim,
    register: u16,
}

impl TemperatureSensor {
    /// Claim input `position` on module `module`.
    pub fn activate(
        core: Arc<LeafletCore>,
        id: &str,
        module: u8,
        position: u8,
    ) -> Result<Self, BspError> {
        let pin = PinIdentity::new(ModuleType::Tmp, module, position);
        let claim = core.claim_pin(pin, id)?;
        let register = core.resolve_for_type(pin)?;
        info!("Temperature sensor '{id}' active on {pin} (register {register})");
        Ok(Self {
            core,
            claim,
            register,
        })
    }

    /// Claimed pin.
    pub fn pin(&self) -> PinIdentity {
        self.claim.pin()
    }

    /// Raw reading in tenths of a degree Celsius.
    pub fn read_decidegrees(&self) -> Result<i16, BspError> {
        let raw = self.core.bus().read_input_register(self.register)?;
        Ok(raw as i16)
    }

    /// Reading in degrees Celsius.
    pub fn read_celsius(&self) -> Result<f64, BspError> {
        Ok(f64::from(self.read_decidegrees()?) / 10.0)
    }
}
