//! Descriptor → [`AddressMap`] construction.
//!
//! Layout of a data row:
//!
//! ```text
//! col 0     | 1  2  3         | 4  5  6         | 7  8  9        | 10 11 12
//! address   | coil group      | contact group   | input reg grp  | holding reg grp
//! ```
//!
//! Within a group the order of type / module number / pin columns is taken
//! from the header rows, which are the first two rows of the descriptor.

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{AddressSpace, ModuleType, PinIdentity};
use leaflet_common::consts::{GROUP_SIZE, HEADER_INFORMATION_OFFSET, HEADER_SENTINEL};
use tracing::{debug, info, warn};

use super::resolver::AddressMap;
use super::source::DescriptorRow;

/// Number of leading rows searched for header labels.
const HEADER_SCAN_ROWS: usize = 2;

/// Labels and markers describing the descriptor format.
///
/// Label matching is case-insensitive and ignores whitespace; a header cell
/// matches when it contains any of the labels.
#[derive(Debug, Clone)]
pub struct DescriptorLayout {
    /// Labels of the module type column.
    pub module_type_labels: Vec<String>,
    /// Labels of the module number column.
    pub module_number_labels: Vec<String>,
    /// Labels of the pin register column.
    pub pin_labels: Vec<String>,
    /// Literal first cell of the header row.
    pub header_sentinel: String,
    /// Substrings marking a row as header or version information.
    pub skip_markers: Vec<String>,
    /// Columns per group.
    pub group_size: usize,
    /// First group column.
    pub information_offset: usize,
}

impl Default for DescriptorLayout {
    fn default() -> Self {
        Self {
            module_type_labels: vec!["Modul Typ".into(), "module type".into()],
            module_number_labels: vec!["ModulNr".into(), "module number".into()],
            pin_labels: vec!["Mreg".into(), "pin register".into()],
            header_sentinel: HEADER_SENTINEL.to_string(),
            skip_markers: vec!["Register".into(), "Version".into()],
            group_size: GROUP_SIZE,
            information_offset: HEADER_INFORMATION_OFFSET,
        }
    }
}

/// Column offsets of the three group fields, relative to the group start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GroupColumns {
    module_type: usize,
    module_number: usize,
    pin: usize,
}

/// Turns descriptor rows into an [`AddressMap`].
#[derive(Debug, Clone, Default)]
pub struct AddressMapBuilder {
    layout: DescriptorLayout,
}

impl AddressMapBuilder {
    /// Builder for a specific descriptor layout.
    pub fn new(layout: DescriptorLayout) -> Self {
        Self { layout }
    }

    /// Build the four register tables.
    ///
    /// # Errors
    /// `BspError::Configuration` when the descriptor has fewer than two rows,
    /// a header label cannot be found, or an address, module number or pin
    /// cell of a live group is not an integer. The message names the 1-based
    /// row and 0-based column.
    pub fn build(&self, rows: &[DescriptorRow]) -> Result<AddressMap, BspError> {
        if rows.len() < HEADER_SCAN_ROWS {
            return Err(BspError::Configuration(format!(
                "address map has {} row(s); at least {HEADER_SCAN_ROWS} are required",
                rows.len()
            )));
        }

        let columns = self.detect_header(rows)?;
        debug!("Descriptor group columns: {:?}", columns);

        let mut map = AddressMap::new();
        let mut skipped_rows = 0usize;
        for (idx, row) in rows.iter().enumerate() {
            let row_number = idx + 1;
            if self.should_skip(row) {
                skipped_rows += 1;
                continue;
            }

            let address = parse_cell::<u16>(row, 0, row_number, "address")?;
            for space in AddressSpace::ALL {
                self.insert_group(&mut map, row, row_number, space, columns, address)?;
            }
        }

        info!(
            "Address map built: {} coils, {} contacts, {} input registers, {} holding registers ({} rows skipped)",
            map.table(AddressSpace::DiscreteOutputCoil).len(),
            map.table(AddressSpace::DiscreteInputContact).len(),
            map.table(AddressSpace::AnalogInputRegister).len(),
            map.table(AddressSpace::AnalogOutputHoldingRegister).len(),
            skipped_rows,
        );
        Ok(map)
    }

    /// Locate the type / number / pin columns in the first two rows.
    fn detect_header(&self, rows: &[DescriptorRow]) -> Result<GroupColumns, BspError> {
        let mut module_type = None;
        let mut module_number = None;
        let mut pin = None;

        let first = self.layout.information_offset;
        let last = first + self.layout.group_size;
        for row in rows.iter().take(HEADER_SCAN_ROWS) {
            for col in first..last.min(row.len()) {
                let cell = normalize(&row[col]);
                let offset = col - first;
                if module_number.is_none() && matches_any(&cell, &self.layout.module_number_labels)
                {
                    module_number = Some(offset);
                } else if module_type.is_none()
                    && matches_any(&cell, &self.layout.module_type_labels)
                {
                    module_type = Some(offset);
                } else if pin.is_none() && matches_any(&cell, &self.layout.pin_labels) {
                    pin = Some(offset);
                }
            }
        }

        let missing = |what: &str| {
            BspError::Configuration(format!(
                "address map header: no '{what}' column in the first {HEADER_SCAN_ROWS} rows"
            ))
        };
        Ok(GroupColumns {
            module_type: module_type.ok_or_else(|| missing("module type"))?,
            module_number: module_number.ok_or_else(|| missing("module number"))?,
            pin: pin.ok_or_else(|| missing("pin register"))?,
        })
    }

    /// Header, blank and version rows carry no register entries.
    fn should_skip(&self, row: &DescriptorRow) -> bool {
        let Some(first) = row.first() else {
            return true;
        };
        first.is_empty()
            || *first == self.layout.header_sentinel
            || row.iter().any(|cell| {
                self.layout
                    .skip_markers
                    .iter()
                    .any(|marker| cell.contains(marker.as_str()))
            })
    }

    fn insert_group(
        &self,
        map: &mut AddressMap,
        row: &DescriptorRow,
        row_number: usize,
        space: AddressSpace,
        columns: GroupColumns,
        address: u16,
    ) -> Result<(), BspError> {
        let start = self.layout.information_offset + space.group() * self.layout.group_size;
        let type_col = start + columns.module_type;
        let number_col = start + columns.module_number;
        let pin_col = start + columns.pin;

        let type_token = row.get(type_col).map(String::as_str).unwrap_or("");
        let module_type = ModuleType::from_token(type_token);

        let number = row.get(number_col).map(String::as_str).unwrap_or("");
        // The carrier board addresses its own registers as module 0.
        if number.is_empty() || (number == "0" && module_type != ModuleType::Leaflet) {
            return Ok(());
        }

        if module_type == ModuleType::Error {
            warn!(
                "Address map row {row_number}, column {type_col}: unknown module type {:?}, {} entry ignored",
                type_token, space
            );
            return Ok(());
        }

        let module = parse_cell::<u8>(row, number_col, row_number, "module number")?;
        let position = parse_cell::<u8>(row, pin_col, row_number, "pin")?;
        let pin = PinIdentity::new(module_type, module, position);

        if let Some(previous) = map.insert(space, pin, address) {
            if previous != address {
                warn!(
                    "Address map row {row_number}: {pin} in {space} redefined ({previous} -> {address})"
                );
            }
        }
        Ok(())
    }
}

/// Parse the cell at `col`, naming the 1-based row and 0-based column on failure.
fn parse_cell<T: std::str::FromStr>(
    row: &DescriptorRow,
    col: usize,
    row_number: usize,
    what: &str,
) -> Result<T, BspError> {
    let cell = row.get(col).map(String::as_str).unwrap_or("");
    cell.trim().parse().map_err(|_| {
        BspError::Configuration(format!(
            "address map row {row_number}, column {col}: {what} {cell:?} is not an integer"
        ))
    })
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn matches_any(cell: &str, labels: &[String]) -> bool {
    !cell.is_empty()
        && labels.iter().any(|label| {
            let label = normalize(label);
            !label.is_empty() && cell.contains(&label)
        })
}
