//! Pin ownership arbitration.
//!
//! Client drivers activate independently and each claims the pins it drives.
//! A pin has at most one owner. Presence bitmasks live under the same lock
//! as ownership, so "module installed" and "pin free" are checked and
//! recorded in one step.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{ModuleType, PinIdentity};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::presence::PresenceSnapshot;

#[derive(Debug, Default)]
struct AllocatorState {
    presence: PresenceSnapshot,
    owners: HashMap<PinIdentity, String>,
}

/// Claim/release of pins by claimant id.
#[derive(Debug, Default)]
pub struct PinAllocator {
    state: Mutex<AllocatorState>,
}

impl PinAllocator {
    /// Allocator with no owners and nothing present.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `pin` for `claimant`.
    ///
    /// 1. The module must be present (GPIO always is).
    /// 2. A free pin is recorded for the claimant.
    /// 3. A pin already held by the same claimant is accepted again.
    /// 4. A pin held by anyone else is refused.
    ///
    /// Failures leave the ownership table untouched.
    pub fn claim(&self, pin: PinIdentity, claimant: &str) -> Result<(), BspError> {
        let mut state = self.state.lock();

        if !state.presence.is_present(pin.module_type, pin.module) {
            debug!("Claim of {pin} by '{claimant}' refused: module not present");
            return Err(BspError::ModuleNotPresent {
                module_type: pin.module_type,
                module: pin.module,
                pin,
            });
        }

        let key = ownership_key(pin);
        match state.owners.get(&key) {
            Some(owner) if owner == claimant => Ok(()),
            Some(owner) => {
                warn!("Pin {pin} requested by '{claimant}' is owned by '{owner}'");
                Err(BspError::AllocationConflict {
                    pin,
                    owner: owner.clone(),
                })
            }
            None => {
                state.owners.insert(key, claimant.to_string());
                info!("Pin {pin} claimed by '{claimant}'");
                Ok(())
            }
        }
    }

    /// Claim `pin` and return a guard that releases it on drop.
    pub fn claim_scoped(
        self: &Arc<Self>,
        pin: PinIdentity,
        claimant: &str,
    ) -> Result<PinClaim, BspError> {
        self.claim(pin, claimant)?;
        Ok(PinClaim {
            allocator: Arc::clone(self),
            pin,
            claimant: claimant.to_string(),
        })
    }

    /// Remove any owner of `pin`. Releasing a free pin does nothing.
    pub fn release(&self, pin: PinIdentity) {
        if let Some(owner) = self.state.lock().owners.remove(&ownership_key(pin)) {
            info!("Pin {pin} released by '{owner}'");
        }
    }

    /// Remove `pin` only if `claimant` owns it. Returns `true` if released.
    pub fn release_owned(&self, pin: PinIdentity, claimant: &str) -> bool {
        let mut state = self.state.lock();
        let key = ownership_key(pin);
        if state.owners.get(&key).map(String::as_str) != Some(claimant) {
            return false;
        }
        state.owners.remove(&key);
        info!("Pin {pin} released by '{claimant}'");
        true
    }

    /// Current owner of `pin`.
    pub fn owner_of(&self, pin: PinIdentity) -> Option<String> {
        self.state.lock().owners.get(&ownership_key(pin)).cloned()
    }

    /// Claimed positions on one module, derived from the ownership table.
    pub fn positions(&self, module_type: ModuleType, module: u8) -> BTreeSet<u8> {
        let module_type = ownership_type(module_type);
        self.state
            .lock()
            .owners
            .keys()
            .filter(|pin| pin.module_type == module_type && pin.module == module)
            .map(|pin| pin.position)
            .collect()
    }

    /// Number of claimed pins.
    pub fn claimed_count(&self) -> usize {
        self.state.lock().owners.len()
    }

    /// All claimed pins with their owners, ordered by pin.
    pub fn claims(&self) -> Vec<(PinIdentity, String)> {
        let mut claims: Vec<_> = self
            .state
            .lock()
            .owners
            .iter()
            .map(|(pin, owner)| (*pin, owner.clone()))
            .collect();
        claims.sort();
        claims
    }

    /// Whether module `module` of `module_type` is installed.
    pub fn is_present(&self, module_type: ModuleType, module: u8) -> bool {
        self.state.lock().presence.is_present(module_type, module)
    }

    /// Current presence bitmasks.
    pub fn presence(&self) -> PresenceSnapshot {
        self.state.lock().presence
    }

    /// Replace the presence bitmasks. Returns `true` if anything changed.
    ///
    /// Existing claims are kept when a module disappears.
    pub fn update_presence(&self, snapshot: PresenceSnapshot) -> bool {
        let mut state = self.state.lock();
        if state.presence == snapshot {
            return false;
        }
        for module_type in ModuleType::PROBED {
            let before = state.presence.slots(module_type);
            let after = snapshot.slots(module_type);
            if before != after {
                info!(
                    "{module_type} presence changed: {:#06b} -> {:#06b}",
                    before.bits(),
                    after.bits()
                );
            }
        }
        state.presence = snapshot;
        true
    }
}

/// Scoped ownership of one pin. Dropping the guard releases the pin.
#[derive(Debug)]
#[must_use = "dropping the claim releases the pin"]
pub struct PinClaim {
    allocator: Arc<PinAllocator>,
    pin: PinIdentity,
    claimant: String,
}

impl PinClaim {
    /// Claimed pin.
    pub fn pin(&self) -> PinIdentity {
        self.pin
    }

    /// Claimant id.
    pub fn claimant(&self) -> &str {
        &self.claimant
    }
}

impl Drop for PinClaim {
    fn drop(&mut self) {
        self.allocator.release_owned(self.pin, &self.claimant);
    }
}

/// GPIO pins are the carrier board's own pins.
fn ownership_type(module_type: ModuleType) -> ModuleType {
    match module_type {
        ModuleType::Gpio => ModuleType::Leaflet,
        other => other,
    }
}

fn ownership_key(pin: PinIdentity) -> PinIdentity {
    PinIdentity::new(ownership_type(pin.module_type), pin.module, pin.position)
}

// ─── Tests ──────────────────────────────────────────────────────────
