//! PWM output.

use std::sync::Arc;

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{ModuleType, PinIdentity};
use tracing::info;

use crate::allocator::PinClaim;
use crate::core::LeafletCore;

/// Highest duty cycle value (100.0 %).
pub const DUTY_MAX_PERMILLE: u16 = 1000;

/// One output on a PWM module.
#[derive(Debug)]
pub struct PwmDevice {
    core: Arc<LeafletCore>,
    claim: PinClaim,
    duty_register: u16,
    inversion_coil: u16,
}

impl PwmDevice {
    /// Claim output `position` on module `module`.
    ///
    /// `frequency_hz` is a module-wide setting applied through
    /// configuration mode.
    pub fn activate(
        core: Arc<LeafletCore>,
        id: &str,
        module: u8,
        position: u8,
        frequency_hz: Option<u16>,
    ) -> Result<Self, BspError> {
        let pin = PinIdentity::new(ModuleType::Pwm, module, position);
        let claim = core.claim_pin(pin, id)?;
        let duty_register = core.resolve_for_type(pin)?;
        let inversion_coil = core.pwm_inversion_address(module, position)?;
        if let Some(frequency_hz) = frequency_hz {
            core.set_pwm_frequency(module, frequency_hz)?;
        }
        info!("PWM '{id}' active on {pin} (duty register {duty_register})");
        Ok(Self {
            core,
            claim,
            duty_register,
            inversion_coil,
        })
    }

    /// Claimed pin.
    pub fn pin(&self) -> PinIdentity {
        self.claim.pin()
    }

    /// Set the duty cycle in per mille.
    pub fn set_duty_permille(&self, duty: u16) -> Result<(), BspError> {
        if duty > DUTY_MAX_PERMILLE {
            return Err(BspError::InvalidSetting(format!(
                "duty {duty} above {DUTY_MAX_PERMILLE} per mille"
            )));
        }
        Ok(self
            .core
            .bus()
            .write_holding_register(self.duty_register, duty)?)
    }

    /// Invert the output signal.
    pub fn set_inverted(&self, inverted: bool) -> Result<(), BspError> {
        Ok(self
            .core
            .bus()
            .write_coil(self.inversion_coil, inverted)?)
    }
}
