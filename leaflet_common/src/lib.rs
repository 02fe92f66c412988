//! Leaflet Common Library
//!
//! This crate provides the shared vocabulary of the Leaflet board support
//! workspace: module and pin identities, register address spaces, the
//! field-bus seam, the error taxonomy and configuration loading.
//!
//! # Module Structure
//!
//! - [`bsp`] - Board types, bus trait, errors and board configuration
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Sentinels, limits and default paths
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! leaflet_common = { path = "../leaflet_common" }
//! ```
//!
//! ```rust
//! use leaflet_common::prelude::*;
//!
//! let pin = PinIdentity::new(ModuleType::Rel, 1, 1);
//! assert_eq!(pin.to_string(), "REL/1/1");
//! ```

pub mod bsp;
pub mod config;
pub mod consts;
pub mod prelude;
