//! Leaflet core: activation and the client capability surface.
//!
//! `LeafletCore` owns everything one carrier board needs: the address map,
//! the pin allocator with presence bitmasks, the configuration-mode
//! coordinator and the protected settings. Client drivers hold an
//! `Arc<LeafletCore>`; the cycle runner calls the two cyclic entry points.
//!
//! Activation order:
//! 1. firmware gate
//! 2. address map
//! 3. configuration and presence registers
//! 4. peripherals enable coil
//! 5. first presence read

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use leaflet_common::bsp::bus::RegisterBus;
use leaflet_common::bsp::config::BspConfig;
use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{
    AddressSpace, AioDirection, AioMode, CompatibilityStatus, ConfigModeState, ModuleType,
    PinIdentity,
};
use leaflet_common::consts::PERIPHERALS_COIL;
use tracing::{debug, error, info, warn};

use crate::address_map::{AddressMap, load_address_map};
use crate::allocator::{PinAllocator, PinClaim};
use crate::config_mode::ConfigModeCoordinator;
use crate::firmware::{CommandProbe, FirmwareGate, StaticProbe, VersionProbe};
use crate::presence::{PresenceProbe, PresenceSnapshot};
use crate::settings::ProtectedSettings;

/// One activated carrier board.
pub struct LeafletCore {
    id: String,
    bus: Arc<dyn RegisterBus>,
    map: Arc<AddressMap>,
    allocator: Arc<PinAllocator>,
    coordinator: ConfigModeCoordinator,
    settings: ProtectedSettings,
    presence_probe: PresenceProbe,
    compatibility: CompatibilityStatus,
    activated_at: Instant,
    cycles: AtomicU64,
}

impl LeafletCore {
    /// Activate using the configured firmware probe command.
    ///
    /// # Errors
    /// `BspError::Configuration` or `BspError::Compatibility`; nothing has
    /// been written to the bus in either case.
    pub fn activate(config: &BspConfig, bus: Arc<dyn RegisterBus>) -> Result<Self, BspError> {
        match CommandProbe::from_command_line(&config.board.firmware_probe) {
            Some(probe) => Self::activate_with_probe(config, bus, &probe),
            // The gate never probes a remote board.
            None if config.board.remote => {
                Self::activate_with_probe(config, bus, &StaticProbe(String::new()))
            }
            None => Err(BspError::Configuration(
                "board.firmware_probe is empty".to_string(),
            )),
        }
    }

    /// Activate with an explicit version probe.
    pub fn activate_with_probe(
        config: &BspConfig,
        bus: Arc<dyn RegisterBus>,
        probe: &dyn VersionProbe,
    ) -> Result<Self, BspError> {
        let board = &config.board;
        info!(
            "Activating Leaflet board '{}' on bus '{}' (unit {})",
            board.id,
            bus.name(),
            board.modbus_unit_id
        );
        if bus.unit_id() != board.modbus_unit_id {
            return Err(BspError::Configuration(format!(
                "bus '{}' addresses unit {}, board '{}' is unit {}",
                bus.name(),
                bus.unit_id(),
                board.id,
                board.modbus_unit_id
            )));
        }

        let gate = FirmwareGate::new(board.remote, board.minimum_firmware_version);
        gate.check(probe)?;

        let source = board.source_path();
        let map = load_address_map(&source)?;
        Self::from_parts(config, bus, map, gate.status())
    }

    /// Activate with an already built address map. The firmware gate must
    /// have passed.
    pub fn from_parts(
        config: &BspConfig,
        bus: Arc<dyn RegisterBus>,
        map: AddressMap,
        compatibility: CompatibilityStatus,
    ) -> Result<Self, BspError> {
        if compatibility != CompatibilityStatus::Compatible {
            return Err(BspError::Compatibility(format!(
                "activation requires compatible firmware, status is {compatibility:?}"
            )));
        }

        let config_register = map.config_mode_register().map_err(|e| {
            BspError::Configuration(format!("address map has no configuration register: {e}"))
        })?;
        let presence_probe = PresenceProbe::new(&map);
        let coordinator = ConfigModeCoordinator::new(
            Arc::clone(&bus),
            config_register,
            config.board.force_exit_attempts,
        );

        let core = Self {
            id: config.board.id.clone(),
            bus,
            map: Arc::new(map),
            allocator: Arc::new(PinAllocator::new()),
            coordinator,
            settings: ProtectedSettings::new(),
            presence_probe,
            compatibility,
            activated_at: Instant::now(),
            cycles: AtomicU64::new(0),
        };

        if let Err(e) = core.bus.write_coil(PERIPHERALS_COIL, true) {
            warn!("Enabling module peripherals failed: {e}");
        }
        core.refresh_presence();

        info!(
            "Leaflet board '{}' active ({} mapped registers, {} presence registers)",
            core.id,
            core.map.len(),
            core.presence_probe.register_count()
        );
        Ok(core)
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Board id from configuration.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared bus handle for client register I/O.
    pub fn bus(&self) -> &Arc<dyn RegisterBus> {
        &self.bus
    }

    /// The immutable address map.
    pub fn address_map(&self) -> &Arc<AddressMap> {
        &self.map
    }

    /// The pin allocator.
    pub fn allocator(&self) -> &Arc<PinAllocator> {
        &self.allocator
    }

    /// Firmware compatibility established at activation.
    pub fn compatibility(&self) -> CompatibilityStatus {
        self.compatibility
    }

    /// Configuration-mode state.
    pub fn config_mode(&self) -> ConfigModeState {
        self.coordinator.state()
    }

    /// The configuration-mode coordinator.
    pub fn coordinator(&self) -> &ConfigModeCoordinator {
        &self.coordinator
    }

    // ─── Client capability surface ──────────────────────────────────

    /// Claim a pin for `claimant`. The returned guard releases it on drop.
    pub fn claim_pin(&self, pin: PinIdentity, claimant: &str) -> Result<PinClaim, BspError> {
        self.allocator.claim_scoped(pin, claimant)
    }

    /// Release a pin regardless of owner.
    pub fn release_pin(&self, pin: PinIdentity) {
        self.allocator.release(pin);
    }

    /// Whether module `module` of `module_type` is installed.
    pub fn is_present(&self, module_type: ModuleType, module: u8) -> bool {
        self.allocator.is_present(module_type, module)
    }

    /// Register of `pin` in `space`.
    pub fn resolve(&self, pin: PinIdentity, space: AddressSpace) -> Result<u16, BspError> {
        self.map.resolve(pin, space)
    }

    /// Register of the pin's primary function.
    pub fn resolve_for_type(&self, pin: PinIdentity) -> Result<u16, BspError> {
        self.map.resolve_for_type(pin)
    }

    /// Value register of an AIO channel.
    pub fn resolve_aio(&self, pin: PinIdentity, direction: AioDirection) -> Result<u16, BspError> {
        self.map.resolve_aio(pin, direction)
    }

    /// Inversion coil of a PWM output.
    pub fn pwm_inversion_address(&self, module: u8, position: u8) -> Result<u16, BspError> {
        self.map.pwm_inversion_address(module, position)
    }

    /// Invert a relay output. Applied through configuration mode.
    pub fn invert_relay(&self, module: u8, position: u8) -> Result<(), BspError> {
        self.apply_relay_inversion(module, position, true)
    }

    /// Undo [`invert_relay`](Self::invert_relay).
    pub fn revert_relay_inversion(&self, module: u8, position: u8) -> Result<(), BspError> {
        self.apply_relay_inversion(module, position, false)
    }

    /// Set the output frequency of a PWM module (24..=1500 Hz).
    pub fn set_pwm_frequency(&self, module: u8, frequency_hz: u16) -> Result<(), BspError> {
        let register = self.map.configuration_register(ModuleType::Pwm, module)?;
        self.settings.set_pwm_frequency(module, frequency_hz, |word| {
            self.coordinator.stage_write(register, word)
        })?;
        info!("PWM module {module}: frequency {frequency_hz} Hz");
        Ok(())
    }

    /// Set the function of an AIO channel.
    pub fn set_aio_mode(&self, module: u8, position: u8, mode: AioMode) -> Result<(), BspError> {
        let register = self.map.configuration_register(ModuleType::Aio, module)?;
        self.settings.set_aio_mode(module, position, mode, |word| {
            self.coordinator.stage_write(register, word)
        })?;
        info!("AIO {module}/{position}: mode {mode:?}");
        Ok(())
    }

    fn apply_relay_inversion(
        &self,
        module: u8,
        position: u8,
        inverted: bool,
    ) -> Result<(), BspError> {
        let register = self.map.configuration_register(ModuleType::Rel, module)?;
        // Staged under the settings lock: settings before coordinator.
        self.settings.set_relay_inversion(module, position, inverted, |word| {
            self.coordinator.stage_write(register, word)
        })?;
        info!("Relay {module}/{position}: inverted={inverted}");
        Ok(())
    }

    // ─── Cyclic entry points ────────────────────────────────────────

    /// Read phase: refresh presence and advance configuration mode.
    pub fn on_before_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.refresh_presence();
        self.coordinator.on_before_cycle();
    }

    /// Write phase: flush staged protected writes.
    pub fn on_execute_write(&self) {
        self.coordinator.on_execute_write();
    }

    /// Leave configuration mode unconditionally. Call before shutdown.
    pub fn deactivate(&self) -> Result<(), BspError> {
        info!(
            "Deactivating Leaflet board '{}' after {} cycles (uptime {}s)",
            self.id,
            self.cycle_count(),
            self.uptime().as_secs()
        );
        self.coordinator.force_idle()
    }

    /// Log every claimed pin at debug level.
    pub fn debug_log(&self) {
        let claims = self.allocator.claims();
        debug!("Board '{}': {} claimed pin(s)", self.id, claims.len());
        for (pin, owner) in claims {
            debug!("  {pin} -> '{owner}'");
        }
    }

    /// Time since activation.
    pub fn uptime(&self) -> Duration {
        self.activated_at.elapsed()
    }

    /// Read phases run since activation.
    pub fn cycle_count(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Current presence bitmasks.
    pub fn presence(&self) -> PresenceSnapshot {
        self.allocator.presence()
    }

    fn refresh_presence(&self) {
        let current = self.allocator.presence();
        let snapshot = self.presence_probe.read(self.bus.as_ref(), &current);
        self.allocator.update_presence(snapshot);
    }
}

impl Drop for LeafletCore {
    fn drop(&mut self) {
        if self.coordinator.state() != ConfigModeState::Idle {
            if let Err(e) = self.coordinator.force_idle() {
                error!("Board '{}' dropped in configuration mode: {e}", self.id);
            }
        }
    }
}

impl std::fmt::Debug for LeafletCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafletCore")
            .field("id", &self.id)
            .field("bus", &self.bus.name())
            .field("registers", &self.map.len())
            .field("config_mode", &self.coordinator.state())
            .field("cycles", &self.cycle_count())
            .finish()
    }
}
