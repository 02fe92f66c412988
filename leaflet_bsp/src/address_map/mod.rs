//! Register address map.
//!
//! - [`source`] - CSV descriptor loading
//! - [`builder`] - Header detection and row partitioning
//! - [`resolver`] - Immutable pin → register lookup

pub mod builder;
pub mod resolver;
pub mod source;

use std::path::Path;

use leaflet_common::bsp::error::BspError;

pub use builder::{AddressMapBuilder, DescriptorLayout};
pub use resolver::AddressMap;
pub use source::{DescriptorRow, load_descriptor, read_descriptor};

/// Load and build the address map at `path` with the default layout.
pub fn load_address_map(path: &Path) -> Result<AddressMap, BspError> {
    let rows = load_descriptor(path)?;
    AddressMapBuilder::default().build(&rows)
}
