//! Configuration-mode state machine.
//!
//! Protected module settings (PWM frequency, AIO channel modes, relay
//! inversion) are only accepted by the carrier board while it is in
//! configuration mode. The board must never be left in that mode: the
//! coordinator leaves it as soon as the written settings read back, and
//! [`force_idle`](ConfigModeCoordinator::force_idle) leaves it
//! unconditionally on shutdown.
//!
//! ```text
//!            enter (1337)
//!   Idle ───────────────────▶ ConfigPending
//!    ▲                              │
//!    │  exit (7331): nothing staged │
//!    │  and read-back == written    │
//!    └──────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use leaflet_common::bsp::bus::{BusError, RegisterBus};
use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::ConfigModeState;
use leaflet_common::consts::{CONFIG_MODE_ENTER, CONFIG_MODE_EXIT};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

/// Sentinel values of the shared configuration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigModeSentinels {
    /// Written to enter configuration mode.
    pub enter: u16,
    /// Written to leave configuration mode.
    pub exit: u16,
}

impl Default for ConfigModeSentinels {
    fn default() -> Self {
        Self {
            enter: CONFIG_MODE_ENTER,
            exit: CONFIG_MODE_EXIT,
        }
    }
}

#[derive(Debug, Default)]
struct CoordinatorState {
    mode: ConfigModeState,
    /// An enter write failed and is retried on the next tick.
    enter_pending: bool,
    /// Protected writes waiting for the next write phase.
    staged: BTreeMap<u16, u16>,
    /// Last value successfully written to each protected register.
    written: BTreeMap<u16, u16>,
    /// Exit sentinel writes issued so far.
    exits: u64,
}

/// Drives the shared configuration register of the carrier board.
pub struct ConfigModeCoordinator {
    bus: Arc<dyn RegisterBus>,
    register: u16,
    sentinels: ConfigModeSentinels,
    force_exit_attempts: u32,
    state: Mutex<CoordinatorState>,
}

impl ConfigModeCoordinator {
    /// Coordinator for the configuration register at `register`.
    pub fn new(bus: Arc<dyn RegisterBus>, register: u16, force_exit_attempts: u32) -> Self {
        Self::with_sentinels(
            bus,
            register,
            force_exit_attempts,
            ConfigModeSentinels::default(),
        )
    }

    /// Coordinator with non-default sentinel values.
    pub fn with_sentinels(
        bus: Arc<dyn RegisterBus>,
        register: u16,
        force_exit_attempts: u32,
        sentinels: ConfigModeSentinels,
    ) -> Self {
        Self {
            bus,
            register,
            sentinels,
            force_exit_attempts: force_exit_attempts.max(1),
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Current state.
    pub fn state(&self) -> ConfigModeState {
        self.state.lock().mode
    }

    /// Number of protected writes not yet on the bus.
    pub fn staged_count(&self) -> usize {
        self.state.lock().staged.len()
    }

    /// Number of exit sentinel writes issued.
    pub fn exit_count(&self) -> u64 {
        self.state.lock().exits
    }

    /// Write the enter sentinel. Re-issued when already pending.
    ///
    /// A failed write is logged and retried by the next
    /// [`on_before_cycle`](Self::on_before_cycle).
    pub fn enter_config_mode(&self) {
        let mut state = self.state.lock();
        self.enter_locked(&mut state);
    }

    /// Queue a protected register write and enter configuration mode.
    ///
    /// The value reaches the bus in the next
    /// [`on_execute_write`](Self::on_execute_write).
    pub fn stage_write(&self, register: u16, value: u16) {
        let mut state = self.state.lock();
        debug!("Staged protected write {value:#06x} -> register {register}");
        state.staged.insert(register, value);
        if state.mode == ConfigModeState::Idle || state.enter_pending {
            self.enter_locked(&mut state);
        }
    }

    /// Read phase of a bus cycle.
    ///
    /// Retries a failed enter, then leaves configuration mode once nothing
    /// is staged and the protected registers read back what was written.
    pub fn on_before_cycle(&self) {
        let mut state = self.state.lock();

        if state.enter_pending {
            self.enter_locked(&mut state);
        }
        if state.mode != ConfigModeState::ConfigPending || !state.staged.is_empty() {
            return;
        }

        let expected = state.written.values().fold(0u16, |acc, v| acc | v);
        let mut actual = 0u16;
        for &register in state.written.keys() {
            match self.bus.read_holding_register(register) {
                Ok(value) => actual |= value,
                Err(e) => {
                    debug!("Read-back of register {register} failed, staying in config mode: {e}");
                    return;
                }
            }
        }

        if actual != expected {
            trace!("Config read-back {actual:#06x} != written {expected:#06x}");
            return;
        }

        match self.write_sentinel(self.sentinels.exit) {
            Ok(()) => {
                state.mode = ConfigModeState::Idle;
                state.exits += 1;
                info!("Configuration applied, left configuration mode");
            }
            Err(e) => warn!("Leaving configuration mode failed, retrying next cycle: {e}"),
        }
    }

    /// Write phase of a bus cycle: flush staged writes while pending.
    ///
    /// A failed write stays staged for the next cycle.
    pub fn on_execute_write(&self) {
        let mut state = self.state.lock();
        if state.mode != ConfigModeState::ConfigPending || state.staged.is_empty() {
            return;
        }

        let staged = std::mem::take(&mut state.staged);
        for (register, value) in staged {
            match self.bus.write_holding_register(register, value) {
                Ok(()) => {
                    debug!("Protected register {register} <- {value:#06x}");
                    state.written.insert(register, value);
                }
                Err(e) => {
                    warn!("Protected write to register {register} failed, retrying: {e}");
                    state.staged.insert(register, value);
                }
            }
        }
    }

    /// Leave configuration mode regardless of read-back.
    ///
    /// Does nothing when already idle. Staged writes are discarded.
    ///
    /// # Errors
    /// `BspError::Bus` with the last failure when every attempt failed; the
    /// state then stays `ConfigPending`.
    pub fn force_idle(&self) -> Result<(), BspError> {
        let mut state = self.state.lock();
        if state.mode == ConfigModeState::Idle && !state.enter_pending {
            return Ok(());
        }
        if !state.staged.is_empty() {
            warn!(
                "Discarding {} staged protected write(s) on forced exit",
                state.staged.len()
            );
            state.staged.clear();
        }

        let mut last_error = None;
        for attempt in 1..=self.force_exit_attempts {
            match self.write_sentinel(self.sentinels.exit) {
                Ok(()) => {
                    state.mode = ConfigModeState::Idle;
                    state.enter_pending = false;
                    state.exits += 1;
                    info!("Configuration mode closed (forced, attempt {attempt})");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Forced exit attempt {attempt}/{} failed: {e}",
                        self.force_exit_attempts
                    );
                    last_error = Some(e);
                }
            }
        }

        error!("Board left in configuration mode after {} attempts", self.force_exit_attempts);
        state.mode = ConfigModeState::ConfigPending;
        Err(BspError::Bus(last_error.unwrap_or_else(|| {
            BusError::Disconnected("no exit attempt made".to_string())
        })))
    }

    fn enter_locked(&self, state: &mut CoordinatorState) {
        match self.write_sentinel(self.sentinels.enter) {
            Ok(()) => {
                if state.mode != ConfigModeState::ConfigPending {
                    info!("Entered configuration mode");
                }
                state.mode = ConfigModeState::ConfigPending;
                state.enter_pending = false;
            }
            Err(e) => {
                warn!("Entering configuration mode failed, retrying next cycle: {e}");
                state.enter_pending = true;
            }
        }
    }

    fn write_sentinel(&self, value: u16) -> Result<(), BusError> {
        self.bus.write_holding_register(self.register, value)
    }
}

impl std::fmt::Debug for ConfigModeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigModeCoordinator")
            .field("bus", &self.bus.name())
            .field("register", &self.register)
            .field("state", &self.state())
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
