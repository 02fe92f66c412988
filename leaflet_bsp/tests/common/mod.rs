//! Shared fixtures: a small carrier-board descriptor and a simulated bus.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use leaflet_bsp::core::LeafletCore;
use leaflet_bsp::drivers::simulation::{SimulationBus, SimulationConfig};
use leaflet_bsp::firmware::StaticProbe;
use leaflet_common::prelude::*;
use tempfile::TempDir;

/// Coils, contacts, input registers, holding registers.
pub const DESCRIPTOR: &str = "\
Modbus Offset,Modul Typ,ModulNr,Mreg,Modul Typ,ModulNr,Mreg,Modul Typ,ModulNr,Mreg,Modul Typ,ModulNr,Mreg
Version 0.78,,,,,,,,,,,,
0,LEAFLET,0,0,,,,,,,LEAFLET,0,0
10,REL,1,1,,,,,,,,,
11,REL,1,2,,,,,,,,,
12,REL,2,1,,,,,,,,,
13,REL,2,3,,,,,,,,,
20,,,,,,,,,,REL,1,0
21,,,,,,,,,,PWM,1,0
22,,,,,,,,,,AIO,1,0
30,PWM,1,1,,,,,,,PWM,1,1
40,,,,LEAFLET,0,3,,,,,,
41,,,,LEAFLET,0,4,,,,,,
50,,,,,,,TMP,1,1,,,
60,,,,,,,AIO,1,1,AIO,1,1
61,,,,,,,AIO,1,2,AIO,1,2
108,,,,,,,LEAFLET,0,8,,,
109,,,,,,,LEAFLET,0,9,,,
110,,,,,,,LEAFLET,0,10,,,
111,,,,,,,LEAFLET,0,11,,,
";

pub const CONFIG_MODE_REGISTER: u16 = 0;
pub const RELAY_CONFIG_REGISTER: u16 = 20;
pub const PWM_CONFIG_REGISTER: u16 = 21;
pub const AIO_CONFIG_REGISTER: u16 = 22;

/// Presence bitmask registers: PWM, REL, TMP, AIO.
pub const PRESENCE_PWM: u16 = 108;
pub const PRESENCE_REL: u16 = 109;
pub const PRESENCE_TMP: u16 = 110;
pub const PRESENCE_AIO: u16 = 111;

/// A board under test with its descriptor on disk.
pub struct Board {
    pub dir: TempDir,
    pub bus: Arc<SimulationBus>,
    pub config: BspConfig,
}

impl Board {
    /// Relay modules 1 and 2, one module of every other type.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("map.csv"), DESCRIPTOR).unwrap();

        let sim = SimulationConfig {
            input_registers: vec![
                [PRESENCE_PWM, 0b1],
                [PRESENCE_REL, 0b11],
                [PRESENCE_TMP, 0b1],
                [PRESENCE_AIO, 0b1],
            ],
            ..SimulationConfig::default()
        };
        let bus = Arc::new(SimulationBus::new(&sim));
        let config = board_config(dir.path(), false);
        Self { dir, bus, config }
    }

    /// Activate with a probe reporting `banner`.
    pub fn activate(&self, banner: &str) -> Result<LeafletCore, BspError> {
        let bus: Arc<dyn RegisterBus> = self.bus.clone();
        LeafletCore::activate_with_probe(&self.config, bus, &StaticProbe(banner.to_string()))
    }

    /// Activate on compatible firmware.
    pub fn core(&self) -> Arc<LeafletCore> {
        Arc::new(self.activate("Leaflet V78.0").unwrap())
    }
}

/// Parsed configuration pointing at `map.csv` in `data_dir`.
pub fn board_config(data_dir: &Path, remote: bool) -> BspConfig {
    BspConfig::from_toml(&format!(
        r#"
[shared]
service_name = "leaflet-bsp-test"

[board]
id = "leaflet-test"
source = "map.csv"
data_dir = "{}"
remote = {remote}
force_exit_attempts = 2
"#,
        data_dir.display()
    ))
    .unwrap()
}

/// One full bus cycle: read phase then write phase.
pub fn cycle(core: &LeafletCore) {
    core.on_before_cycle();
    core.on_execute_write();
}
