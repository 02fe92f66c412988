//! Relay output.

use std::sync::Arc;

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{ModuleType, PinIdentity};
use tracing::info;

use crate::allocator::PinClaim;
use crate::core::LeafletCore;

/// One relay on a relay module.
#[derive(Debug)]
pub struct RelayDevice {
    core: Arc<LeafletCore>,
    claim: PinClaim,
    coil: u16,
    inverted: bool,
}

impl RelayDevice {
    /// Claim relay `position` on module `module` and resolve its coil.
    ///
    /// With `inverted` the relay's inversion bit is applied through
    /// configuration mode.
    pub fn activate(
        core: Arc<LeafletCore>,
        id: &str,
        module: u8,
        position: u8,
        inverted: bool,
    ) -> Result<Self, BspError> {
        let pin = PinIdentity::new(ModuleType::Rel, module, position);
        let claim = core.claim_pin(pin, id)?;
        let coil = core.resolve_for_type(pin)?;
        if inverted {
            core.invert_relay(module, position)?;
        }
        info!("Relay '{id}' active on {pin} (coil {coil})");
        Ok(Self {
            core,
            claim,
            coil,
            inverted,
        })
    }

    /// Claimed pin.
    pub fn pin(&self) -> PinIdentity {
        self.claim.pin()
    }

    /// Coil address.
    pub fn coil(&self) -> u16 {
        self.coil
    }

    /// Switch the relay.
    pub fn set(&self, on: bool) -> Result<(), BspError> {
        Ok(self.core.bus().write_coil(self.coil, on)?)
    }

    /// Current coil state.
    pub fn get(&self) -> Result<bool, BspError> {
        Ok(self.core.bus().read_coil(self.coil)?)
    }

    /// Undo the inversion (if any) and release the pin.
    pub fn deactivate(self) -> Result<(), BspError> {
        if self.inverted {
            let pin = self.pin();
            self.core.revert_relay_inversion(pin.module, pin.position)?;
        }
        Ok(())
    }
}
