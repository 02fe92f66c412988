//! System-wide constants for the Leaflet workspace.
//!
//! Single source of truth for sentinels, limits and default paths.
//! Values that the board firmware may change between releases are only
//! defaults here: the address-map builder and the firmware gate take them
//! as constructor arguments.

use static_assertions::const_assert;
use static_assertions::const_assert_ne;

/// Value written to the shared configuration register to enter configuration mode.
pub const CONFIG_MODE_ENTER: u16 = 1337;

/// Value written to the shared configuration register to leave configuration mode.
pub const CONFIG_MODE_EXIT: u16 = 7331;

/// Minimum firmware version, compared against the major of `V<major>.<minor>`.
pub const MINIMUM_FIRMWARE_VERSION: u32 = 78;

/// Default command used to query the base-software version.
pub const DEFAULT_FIRMWARE_PROBE: &[&str] = &["leafletbs", "-v"];

/// Number of register spaces described by the address-map descriptor.
pub const REGISTER_SPACE_COUNT: usize = 4;

/// Columns per register-space group (type, module number, pin).
pub const GROUP_SIZE: usize = 3;

/// First descriptor column holding group data (column 0 is the address).
pub const HEADER_INFORMATION_OFFSET: usize = 1;

/// Literal first cell of the descriptor header row.
pub const HEADER_SENTINEL: &str = "Modbus Offset";

/// Highest module slot number any module type can occupy.
pub const MAX_MODULE_SLOTS: u8 = 8;

/// Number of AIO channels per AIO module.
pub const AIO_CHANNELS_PER_MODULE: u8 = 4;

/// Bits used per AIO channel in the module configuration word.
pub const AIO_BITS_PER_CHANNEL: u8 = 4;

/// Lowest accepted PWM frequency in Hz.
pub const PWM_FREQUENCY_MIN_HZ: u16 = 24;

/// Highest accepted PWM frequency in Hz.
pub const PWM_FREQUENCY_MAX_HZ: u16 = 1500;

/// Field-bus unit id the carrier board answers on by default.
pub const DEFAULT_MODBUS_UNIT_ID: u8 = 1;

/// Carrier board coil enabling the module peripherals.
pub const PERIPHERALS_COIL: u16 = 0;

/// Number of digital inputs on the carrier board.
pub const BOARD_INPUT_COUNT: u8 = 4;

/// Carrier-board pin of digital input 1; the others follow in order.
pub const BOARD_INPUT_FIRST_PIN: u8 = 3;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/leaflet/bsp.toml";

/// Default directory relative descriptor paths are resolved against.
pub const DEFAULT_DATA_DIR: &str = "/usr/lib/leaflet/data";

/// Default bus cycle period in milliseconds.
pub const DEFAULT_CYCLE_TIME_MS: u64 = 1000;

/// Default number of exit writes attempted when forcing idle on shutdown.
pub const DEFAULT_FORCE_EXIT_ATTEMPTS: u32 = 3;

const_assert_ne!(CONFIG_MODE_ENTER, CONFIG_MODE_EXIT);
const_assert!(MAX_MODULE_SLOTS as u32 <= u16::BITS);
const_assert!((AIO_CHANNELS_PER_MODULE * AIO_BITS_PER_CHANNEL) as u32 <= u16::BITS);
const_assert!(PWM_FREQUENCY_MIN_HZ < PWM_FREQUENCY_MAX_HZ);
const_assert!(BOARD_INPUT_FIRST_PIN > PERIPHERALS_COIL as u8);
