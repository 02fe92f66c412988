//! Carrier-board digital inputs.
//!
//! The board has [`BOARD_INPUT_COUNT`] inputs. Input `n` is the carrier
//! pin `BOARD_INPUT_FIRST_PIN + n - 1`, read as a discrete input contact
//! under the `LEAFLET` tables.

use std::sync::Arc;

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{ModuleType, PinIdentity};
use leaflet_common::consts::{BOARD_INPUT_COUNT, BOARD_INPUT_FIRST_PIN};
use tracing::info;

use crate::allocator::PinClaim;
use crate::core::LeafletCore;

/// One digital input on the carrier board.
#[derive(Debug)]
pub struct BoardInput {
    core: Arc<LeafletCore>,
    claim: PinClaim,
    contact: u16,
}

impl BoardInput {
    /// Claim board input `input` (1-based).
    pub fn activate(core: Arc<LeafletCore>, id: &str, input: u8) -> Result<Self, BspError> {
        let pin = Self::pin_of(input)?;
        let claim = core.claim_pin(pin, id)?;
        let contact = core.resolve_for_type(pin)?;
        info!("Board input '{id}' active on {pin} (contact {contact})");
        Ok(Self {
            core,
            claim,
            contact,
        })
    }

    /// Carrier pin of board input `input`.
    pub fn pin_of(input: u8) -> Result<PinIdentity, BspError> {
        if !(1..=BOARD_INPUT_COUNT).contains(&input) {
            return Err(BspError::InvalidSetting(format!(
                "board input {input} outside 1..={BOARD_INPUT_COUNT}"
            )));
        }
        Ok(PinIdentity::new(
            ModuleType::Gpio,
            0,
            BOARD_INPUT_FIRST_PIN + input - 1,
        ))
    }

    /// Claimed pin.
    pub fn pin(&self) -> PinIdentity {
        self.claim.pin()
    }

    /// Contact address.
    pub fn contact(&self) -> u16 {
        self.contact
    }

    /// Current input level.
    pub fn read(&self) -> Result<bool, BspError> {
        Ok(self.core.bus().read_discrete_input(self.contact)?)
    }
}
