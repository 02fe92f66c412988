//! Common re-exports.
//!
//! ```rust
//! use leaflet_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::bsp::config::{BoardConfig, BspConfig};
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Board types ────────────────────────────────────────────────────
pub use crate::bsp::types::{
    AddressSpace, AioDirection, AioMode, CompatibilityStatus, ConfigModeState, ModuleSlots,
    ModuleNumber, ModuleType, PinIdentity,
};

// ─── Bus & errors ───────────────────────────────────────────────────
pub use crate::bsp::bus::{BusError, BusFactory, RegisterBus};
pub use crate::bsp::error::BspError;
