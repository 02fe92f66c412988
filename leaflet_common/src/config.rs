//! Configuration loading traits and types.
//!
//! Every Leaflet binary reads one TOML file. Types embed [`SharedConfig`]
//! under `[shared]` and get [`ConfigLoader::load`] for free.
//!
//! ```rust,no_run
//! use leaflet_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct ToolConfig {
//!     shared: SharedConfig,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = ToolConfig::load(Path::new("tool.toml"))?;
//!     println!("{}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Configuration file not found at the given path.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The file could not be read or is not valid TOML for the target type.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log verbosity, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Fields every Leaflet configuration file carries under `[shared]`.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "leaflet-bsp"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier used in log output.
    pub service_name: String,
}

impl SharedConfig {
    /// Rejects an empty `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shared.service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load any deserializable configuration type from a TOML file.
///
/// - missing file: `ConfigError::FileNotFound`
/// - unreadable file or bad TOML: `ConfigError::ParseError`
///
/// Semantic validation is left to the concrete type.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and parse `path`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::ParseError(format!("{}: {e}", path.display()))
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        shared: SharedConfig,
    }

    #[test]
    fn log_level_defaults_to_info() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::default().as_filter(), "info");
    }

    #[test]
    fn log_level_parses_lowercase() {
        #[derive(Deserialize)]
        struct Level {
            level: LogLevel,
        }
        for (text, level) in [
            ("trace", LogLevel::Trace),
            ("debug", LogLevel::Debug),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ] {
            let parsed: Level = toml::from_str(&format!("level = \"{text}\"")).unwrap();
            assert_eq!(parsed.level, level);
            assert_eq!(level.as_filter(), text);
        }
        assert!(toml::from_str::<Level>("level = \"loud\"").is_err());
    }

    #[test]
    fn blank_service_name_rejected() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "  ".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let result = Wrapper::load(Path::new("/nonexistent/leaflet/bsp.toml"));
        match result {
            Err(ConfigError::FileNotFound(path)) => assert!(path.contains("bsp.toml")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[shared").unwrap();
        assert!(matches!(
            Wrapper::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn loads_shared_section() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "[shared]\nlog_level = \"debug\"\nservice_name = \"leaflet-bsp\"\n"
        )
        .unwrap();
        file.flush().unwrap();

        let config = Wrapper::load(file.path()).unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.shared.service_name, "leaflet-bsp");
    }
}
