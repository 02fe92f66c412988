//! # Leaflet BSP Binary
//!
//! Activates one Leaflet carrier board and runs its bus cycle until ctrl-c.
//! On exit the board is always taken out of configuration mode.
//!
//! # Usage
//!
//! ```bash
//! # Simulated board
//! leaflet_bsp --config config/bsp.toml --simulate
//!
//! # Ten cycles with debug logging
//! leaflet_bsp -c config/bsp.toml -s -v --cycles 10
//!
//! # JSON logs
//! leaflet_bsp --config /etc/leaflet/bsp.toml --json
//! ```

#![deny(warnings)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;
use leaflet_bsp::bus_registry::BusRegistry;
use leaflet_bsp::core::LeafletCore;
use leaflet_bsp::drivers::simulation;
use leaflet_bsp::firmware::StaticProbe;
use leaflet_bsp::runner::CycleRunner;
use leaflet_common::consts::DEFAULT_CONFIG_PATH;
use leaflet_common::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Leaflet BSP - register allocator and module coordinator for Leaflet boards
#[derive(Parser, Debug)]
#[command(name = "leaflet_bsp")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Register allocator and module coordinator for Leaflet boards")]
#[command(long_about = None)]
struct Args {
    /// Path to the board configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Bus backend, overrides `bus` from the configuration
    #[arg(short, long)]
    bus: Option<String>,

    /// Force the simulation bus and its firmware banner
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Stop after this many cycles
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,
}

fn main() {
    if let Err(e) = run() {
        error!("Leaflet BSP failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Tracing comes up before a load error is returned so it gets logged.
    let (log_level, config) = load_config(&args.config);
    setup_tracing(&args, log_level);
    let config = config?;

    info!(
        "Leaflet BSP v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    if !config.board.enabled {
        info!("Board '{}' is disabled in configuration", config.board.id);
        return Ok(());
    }

    let bus_name = if args.simulate {
        info!("Simulation mode enabled");
        simulation::NAME.to_string()
    } else {
        args.bus.clone().unwrap_or_else(|| config.bus.clone())
    };

    let core = if bus_name == simulation::NAME {
        // The simulated board answers the version probe itself.
        let sim_config = simulation::simulation_config(&config)?;
        let bus = Arc::new(
            simulation::SimulationBus::new(&sim_config)
                .with_unit_id(config.board.modbus_unit_id),
        );
        let probe = StaticProbe(bus.banner().to_string());
        LeafletCore::activate_with_probe(&config, bus, &probe)?
    } else {
        let registry = BusRegistry::with_builtin()?;
        let bus = registry.create(&bus_name, &config)?;
        LeafletCore::activate(&config, bus)?
    };
    let core = Arc::new(core);

    let mut runner = CycleRunner::new(
        Arc::clone(&core),
        Duration::from_millis(config.board.cycle_time_ms),
    );
    let running = runner.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    runner.run(args.cycles);

    core.deactivate()?;
    info!("Leaflet BSP shutdown complete");
    Ok(())
}

/// Load and validate the configuration, with the log level to start with.
///
/// The level falls back to the default when the configuration is unusable.
fn load_config(path: &Path) -> (LogLevel, Result<BspConfig, ConfigError>) {
    let config = BspConfig::load(path).and_then(|config| {
        config.validate()?;
        Ok(config)
    });
    let level = config
        .as_ref()
        .map_or_else(|_| LogLevel::default(), |config| config.shared.log_level);
    (level, config)
}

/// Install the tracing subscriber; `-v` overrides the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_filter()
    } else {
        level.as_filter()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn unusable_config_still_yields_a_log_level() {
        let (level, config) = load_config(Path::new("/nonexistent/leaflet/bsp.toml"));
        assert_eq!(level, LogLevel::default());
        assert!(matches!(config, Err(ConfigError::FileNotFound(_))));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[board]\nid = \"\"\n").unwrap();
        let (level, config) = load_config(file.path());
        assert_eq!(level, LogLevel::default());
        assert!(config.is_err());
    }

    #[test]
    fn configured_log_level_is_used() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "[shared]\nlog_level = \"debug\"\nservice_name = \"bsp\"\n\n[board]\nid = \"b1\"\nsource = \"map.csv\"\n"
        )
        .unwrap();
        let (level, config) = load_config(file.path());
        assert_eq!(level, LogLevel::Debug);
        assert_eq!(config.unwrap().board.id, "b1");
    }
}
