//! Board support package types, bus seam, errors and configuration.
//!
//! This module contains everything the Leaflet core and its client drivers
//! share: the identity of a pin on the module stack, the four register
//! spaces of the field bus, and the trait through which registers are read
//! and written.

pub mod bus;
pub mod config;
pub mod error;
pub mod types;
