//! # Leaflet BSP Library
//!
//! Board support for the Leaflet field-bus module stack: relay, temperature,
//! PWM and analog I/O modules plugged onto one carrier board.
//!
//! # Module Structure
//!
//! - [`address_map`] - Descriptor loading, header detection, register lookup
//! - [`presence`] - Module presence bitmasks
//! - [`allocator`] - Pin ownership with conflict detection
//! - [`config_mode`] - Configuration-mode state machine
//! - [`firmware`] - Firmware compatibility gate
//! - [`settings`] - Protected per-module configuration words
//! - [`core`] - `LeafletCore` activation and client surface
//! - [`runner`] - Fixed-period bus cycle loop
//! - [`bus_registry`] - Bus backend factories
//! - [`drivers`] - Bus backends (simulation)
//! - [`clients`] - Relay, temperature, PWM, AIO and board input clients
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                           leaflet_bsp                              │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌────────────────────┐  │
//! │  │ FirmwareGate │──►│ AddressMapBuilder│──►│ AddressMap (Arc)   │  │
//! │  └──────────────┘   └──────────────────┘   └─────────┬──────────┘  │
//! │                                                      │             │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌─────────▼──────────┐  │
//! │  │ CycleRunner  │──►│   LeafletCore    │◄──│ Clients (relay...) │  │
//! │  └──────────────┘   └───┬─────────┬────┘   └────────────────────┘  │
//! │                         │         │                                │
//! │             ┌───────────▼──┐  ┌───▼──────────────────┐             │
//! │             │ PinAllocator │  │ConfigModeCoordinator │             │
//! │             └──────────────┘  └───┬──────────────────┘             │
//! │                                   ▼                                │
//! │                         RegisterBus (trait object)                 │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod address_map;
pub mod allocator;
pub mod bus_registry;
pub mod clients;
pub mod config_mode;
pub mod core;
pub mod drivers;
pub mod firmware;
pub mod presence;
pub mod runner;
pub mod settings;

pub use crate::address_map::{AddressMap, AddressMapBuilder, DescriptorLayout};
pub use crate::allocator::{PinAllocator, PinClaim};
pub use crate::bus_registry::BusRegistry;
pub use crate::config_mode::ConfigModeCoordinator;
pub use crate::core::LeafletCore;
pub use crate::firmware::{FirmwareGate, VersionProbe};
pub use crate::runner::CycleRunner;
