//! Firmware compatibility gate.
//!
//! The carrier board's base software reports its version as free text, for
//! example `Leaflet V78.0 running`. Nothing touches the bus before the gate
//! has passed.

use std::fmt;
use std::process::Command;

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::CompatibilityStatus;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Source of the firmware version banner.
pub trait VersionProbe: Send + Sync {
    /// Raw banner text, or a description of why it could not be obtained.
    fn probe(&self) -> Result<String, String>;
}

/// Runs an external command and returns its standard output.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
}

impl CommandProbe {
    /// Probe from a command line such as `["leafletbs", "-v"]`.
    ///
    /// Returns `None` for an empty command line.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl VersionProbe for CommandProbe {
    fn probe(&self) -> Result<String, String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| format!("failed to run '{}': {e}", self.program))?;
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(format!(
                "'{}' produced no output (status {})",
                self.program, output.status
            ));
        }
        Ok(text)
    }
}

/// Returns a fixed banner. Used by the simulation bus and tests.
#[derive(Debug, Clone)]
pub struct StaticProbe(pub String);

impl VersionProbe for StaticProbe {
    fn probe(&self) -> Result<String, String> {
        Ok(self.0.clone())
    }
}

/// Firmware version `V<major>[.<minor>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FirmwareVersion {
    /// Major version.
    pub major: u32,
    /// Minor version, 0 when absent.
    pub minor: u32,
}

impl FirmwareVersion {
    /// Whether this version is at or above `minimum` (a major version).
    pub fn satisfies(&self, minimum: u32) -> bool {
        self.major >= minimum
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}.{}", self.major, self.minor)
    }
}

/// Extract the version from a banner.
///
/// Takes the first `V` followed by a digit, reads up to the next
/// whitespace and ignores anything that is not a digit or `.`.
pub fn parse_version(banner: &str) -> Option<FirmwareVersion> {
    let start = banner
        .char_indices()
        .find(|&(idx, c)| {
            c == 'V'
                && banner[idx + 1..]
                    .chars()
                    .next()
                    .is_some_and(|n| n.is_ascii_digit())
        })
        .map(|(idx, _)| idx + 1)?;

    let token: String = banner[start..]
        .chars()
        .take_while(|c| !c.is_whitespace())
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut parts = token.split('.').filter(|p| !p.is_empty());
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => minor.parse().ok()?,
        None => 0,
    };
    Some(FirmwareVersion { major, minor })
}

/// One-shot compatibility check, memoized after the first successful probe.
#[derive(Debug)]
pub struct FirmwareGate {
    remote: bool,
    minimum: u32,
    state: Mutex<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
    status: CompatibilityStatus,
    version: Option<FirmwareVersion>,
}

impl FirmwareGate {
    /// Gate for a board; `remote` boards cannot be probed and always pass.
    pub fn new(remote: bool, minimum: u32) -> Self {
        Self {
            remote,
            minimum,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Last evaluated status.
    pub fn status(&self) -> CompatibilityStatus {
        self.state.lock().status
    }

    /// Version parsed from the last banner, if any.
    pub fn version(&self) -> Option<FirmwareVersion> {
        self.state.lock().version
    }

    /// Evaluate compatibility, probing at most until one probe succeeds.
    ///
    /// An unreachable probe or an unparsable banner leaves the status
    /// `Unknown`, which is treated as incompatible.
    pub fn evaluate(&self, probe: &dyn VersionProbe) -> CompatibilityStatus {
        let mut state = self.state.lock();
        if state.status != CompatibilityStatus::Unknown {
            return state.status;
        }
        if self.remote {
            info!("Remote board: firmware check skipped");
            state.status = CompatibilityStatus::Compatible;
            return state.status;
        }

        let banner = match probe.probe() {
            Ok(banner) => banner,
            Err(e) => {
                warn!("Firmware probe failed: {e}");
                return state.status;
            }
        };
        debug!("Firmware banner: {banner:?}");

        match parse_version(&banner) {
            Some(version) if version.satisfies(self.minimum) => {
                info!("Firmware {version} compatible (minimum {})", self.minimum);
                state.status = CompatibilityStatus::Compatible;
                state.version = Some(version);
            }
            Some(version) => {
                warn!("Firmware {version} below minimum {}", self.minimum);
                state.status = CompatibilityStatus::Incompatible;
                state.version = Some(version);
            }
            None => warn!("Firmware banner {banner:?} has no version"),
        }
        state.status
    }

    /// [`evaluate`](Self::evaluate), failing unless compatible.
    pub fn check(&self, probe: &dyn VersionProbe) -> Result<(), BspError> {
        match self.evaluate(probe) {
            CompatibilityStatus::Compatible => Ok(()),
            CompatibilityStatus::Incompatible => {
                let detected = self
                    .version()
                    .map_or_else(|| "version unknown".to_string(), |v| v.to_string());
                Err(BspError::Compatibility(format!(
                    "firmware {detected} is older than the minimum version {}",
                    self.minimum
                )))
            }
            CompatibilityStatus::Unknown => Err(BspError::Compatibility(
                "firmware version could not be determined".to_string(),
            )),
        }
    }
}
