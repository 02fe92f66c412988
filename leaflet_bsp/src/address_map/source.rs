//! Descriptor loading.
//!
//! The address-map descriptor is a CSV export shipped with each firmware
//! release. Rows have no fixed width and the first rows are headers, so the
//! reader takes every record as plain trimmed strings and leaves all
//! interpretation to [`AddressMapBuilder`](super::AddressMapBuilder).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use leaflet_common::bsp::error::BspError;
use tracing::debug;

/// One descriptor row: trimmed cell strings, possibly ragged.
pub type DescriptorRow = Vec<String>;

/// Read all rows of the descriptor at `path`.
///
/// # Errors
/// `BspError::Configuration` if the file cannot be opened or a record is
/// not valid CSV.
pub fn load_descriptor(path: &Path) -> Result<Vec<DescriptorRow>, BspError> {
    let file = File::open(path).map_err(|e| {
        BspError::Configuration(format!(
            "address map {} could not be opened: {e}",
            path.display()
        ))
    })?;
    let rows = read_descriptor(file)?;
    debug!("Read {} descriptor rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read all rows of a descriptor from any reader.
pub fn read_descriptor<R: Read>(reader: R) -> Result<Vec<DescriptorRow>, BspError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| {
            BspError::Configuration(format!("address map record {}: {e}", idx + 1))
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
