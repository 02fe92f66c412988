//! Board configuration types.
//!
//! This module contains the configuration loaded from `bsp.toml`:
//! - `BspConfig` - Top-level file: shared section, board section, bus selection
//! - `BoardConfig` - Descriptor location, firmware gate and cycle settings
//!
//! # TOML Example
//!
//! ```toml
//! bus = "simulation"
//!
//! [shared]
//! service_name = "leaflet-bsp"
//! log_level = "info"
//!
//! [board]
//! id = "leaflet0"
//! source = "leaflet_register_map.csv"
//! remote = false
//!
//! [bus_config.simulation]
//! firmware_banner = "Leaflet V78.0 running"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_CYCLE_TIME_MS, DEFAULT_DATA_DIR, DEFAULT_FIRMWARE_PROBE, DEFAULT_FORCE_EXIT_ATTEMPTS,
    DEFAULT_MODBUS_UNIT_ID, MINIMUM_FIRMWARE_VERSION,
};

fn default_bus() -> String {
    "simulation".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_modbus_unit_id() -> u8 {
    DEFAULT_MODBUS_UNIT_ID
}

fn default_cycle_time_ms() -> u64 {
    DEFAULT_CYCLE_TIME_MS
}

fn default_firmware_probe() -> Vec<String> {
    DEFAULT_FIRMWARE_PROBE.iter().map(|s| s.to_string()).collect()
}

fn default_minimum_firmware_version() -> u32 {
    MINIMUM_FIRMWARE_VERSION
}

fn default_force_exit_attempts() -> u32 {
    DEFAULT_FORCE_EXIT_ATTEMPTS
}

/// Main configuration loaded from `bsp.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BspConfig {
    /// Service name and log level.
    pub shared: SharedConfig,

    /// Carrier board settings.
    pub board: BoardConfig,

    /// Name of the bus backend to use (e.g., "simulation").
    #[serde(default = "default_bus")]
    pub bus: String,

    /// Per-backend configuration sections.
    /// Key = backend name, Value = backend-specific TOML table.
    #[serde(default)]
    pub bus_config: HashMap<String, toml::Value>,
}

/// Carrier board section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Identifier of this board instance (used in logs).
    pub id: String,

    /// Disabled boards skip activation entirely.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Address-map descriptor. Relative paths resolve against `data_dir`.
    pub source: PathBuf,

    /// Base directory for relative descriptor paths.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Running against a remote/virtual board: the firmware cannot be probed.
    #[serde(default)]
    pub remote: bool,

    /// Field-bus unit id of the carrier board. The bus must address the
    /// same unit or activation fails.
    #[serde(default = "default_modbus_unit_id")]
    pub modbus_unit_id: u8,

    /// Bus cycle period in milliseconds.
    #[serde(default = "default_cycle_time_ms")]
    pub cycle_time_ms: u64,

    /// Command line of the firmware version probe.
    #[serde(default = "default_firmware_probe")]
    pub firmware_probe: Vec<String>,

    /// Minimum accepted firmware version.
    #[serde(default = "default_minimum_firmware_version")]
    pub minimum_firmware_version: u32,

    /// Exit writes attempted when forcing configuration mode closed.
    #[serde(default = "default_force_exit_attempts")]
    pub force_exit_attempts: u32,
}

impl BoardConfig {
    /// Descriptor path with `data_dir` applied to relative paths.
    pub fn source_path(&self) -> PathBuf {
        resolve_path(&self.data_dir, &self.source)
    }
}

impl BspConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// 1. shared section valid
    /// 2. `board.id` and `board.source` non-empty
    /// 3. `cycle_time_ms` > 0
    /// 4. `firmware_probe` names a program unless `remote`
    /// 5. `force_exit_attempts` > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.board.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "board.id cannot be empty".to_string(),
            ));
        }
        if self.board.source.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "board.source cannot be empty".to_string(),
            ));
        }
        if self.board.cycle_time_ms == 0 {
            return Err(ConfigError::ValidationError(
                "board.cycle_time_ms must be greater than 0".to_string(),
            ));
        }
        if !self.board.remote && self.board.firmware_probe.is_empty() {
            return Err(ConfigError::ValidationError(
                "board.firmware_probe must name a program for a local board".to_string(),
            ));
        }
        if self.board.force_exit_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "board.force_exit_attempts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend-specific section for the named bus, if present.
    pub fn bus_section(&self, name: &str) -> Option<&toml::Value> {
        self.bus_config.get(name)
    }
}

/// Resolve a possibly relative path against a base directory.
fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
