//! Field-bus trait and transport error type.
//!
//! This module defines:
//! - `RegisterBus` trait - Interface for register-oriented field-bus backends
//! - `BusError` enum - Transport failures
//! - `BusFactory` type alias - Factory function type
//!
//! Framing, polling cadence and wire encoding live behind this trait. The
//! Leaflet core only needs single-register reads and writes in each of the
//! four address spaces.

use std::sync::Arc;

use thiserror::Error;

use crate::bsp::config::BspConfig;
use crate::bsp::error::BspError;

/// Transport failure reported by a bus backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The device did not answer in time.
    #[error("bus timeout at address {address}")]
    Timeout {
        /// Register address of the failed request.
        address: u16,
    },

    /// The device answered with an exception.
    #[error("device rejected request at address {address}: {reason}")]
    Rejected {
        /// Register address of the failed request.
        address: u16,
        /// Exception text reported by the backend.
        reason: String,
    },

    /// The connection to the device is not available.
    #[error("bus disconnected: {0}")]
    Disconnected(String),
}

/// Factory function type for creating bus instances from configuration.
pub type BusFactory = fn(&BspConfig) -> Result<Arc<dyn RegisterBus>, BspError>;

/// Trait defining the interface for field-bus backends.
///
/// All methods take `&self`; backends synchronise internally so one bus can
/// be shared by the core, the cycle runner and client drivers.
///
/// # Timing Contracts
///
/// | Operation | Max Duration |
/// |-----------|--------------|
/// | any read/write | one bus transaction |
pub trait RegisterBus: Send + Sync {
    /// Returns the backend's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Field-bus unit id this bus addresses.
    fn unit_id(&self) -> u8;

    /// Read a 16-bit input register.
    fn read_input_register(&self, address: u16) -> Result<u16, BusError>;

    /// Read a 16-bit holding register.
    fn read_holding_register(&self, address: u16) -> Result<u16, BusError>;

    /// Write a 16-bit holding register.
    fn write_holding_register(&self, address: u16, value: u16) -> Result<(), BusError>;

    /// Read a coil.
    fn read_coil(&self, address: u16) -> Result<bool, BusError>;

    /// Write a coil.
    fn write_coil(&self, address: u16, value: bool) -> Result<(), BusError>;

    /// Read a discrete input contact.
    fn read_discrete_input(&self, address: u16) -> Result<bool, BusError>;
}
