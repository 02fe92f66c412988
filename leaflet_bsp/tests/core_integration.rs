//! End-to-end tests of `LeafletCore` on the simulation bus.
//!
//! Activation and the firmware gate, pin claims against live presence,
//! register resolution, and the configuration-mode round trip driven by
//! bus cycles.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use leaflet_bsp::core::LeafletCore;
use leaflet_bsp::drivers::simulation::SimulationBus;
use leaflet_bsp::firmware::StaticProbe;
use leaflet_bsp::runner::CycleRunner;
use leaflet_common::prelude::*;

// ─── Activation ─────────────────────────────────────────────────────

#[test]
fn activation_enables_peripherals_and_reads_presence() {
    let board = Board::new();
    let core = board.core();

    assert_eq!(core.compatibility(), CompatibilityStatus::Compatible);
    assert_eq!(core.config_mode(), ConfigModeState::Idle);
    assert!(board.bus.coil(0), "peripherals coil must be set");

    assert!(core.is_present(ModuleType::Rel, 1));
    assert!(core.is_present(ModuleType::Rel, 2));
    assert!(!core.is_present(ModuleType::Rel, 3));
    assert!(core.is_present(ModuleType::Tmp, 1));
    assert!(core.is_present(ModuleType::Gpio, 0));
}

#[test]
fn old_firmware_is_rejected_before_touching_the_bus() {
    let board = Board::new();
    let err = board.activate("Leaflet V77.3").unwrap_err();

    assert!(matches!(err, BspError::Compatibility(_)), "{err}");
    assert!(err.to_string().contains("V77.3"), "{err}");
    assert!(err.is_fatal());
    assert!(!board.bus.coil(0));
    assert!(board.bus.holding_writes(CONFIG_MODE_REGISTER).is_empty());
}

#[test]
fn bus_on_another_unit_is_rejected() {
    let board = Board::new();
    let bus = Arc::new(SimulationBus::default().with_unit_id(2));
    let err = LeafletCore::activate_with_probe(
        &board.config,
        bus.clone(),
        &StaticProbe("Leaflet V78.0".into()),
    )
    .unwrap_err();

    assert!(matches!(err, BspError::Configuration(_)), "{err}");
    assert!(!bus.coil(0));
}

#[test]
fn unreadable_banner_is_rejected() {
    let board = Board::new();
    let err = board.activate("leafletbs: command not found").unwrap_err();
    assert!(matches!(err, BspError::Compatibility(_)));
}

#[test]
fn newer_firmware_is_accepted() {
    let board = Board::new();
    assert!(board.activate("Leaflet base software V81.12").is_ok());
}

#[test]
fn remote_board_is_never_probed() {
    let board = Board::new();
    let config = board_config(board.dir.path(), true);
    let bus: Arc<dyn RegisterBus> = board.bus.clone();

    let core = LeafletCore::activate(&config, bus).unwrap();
    assert_eq!(core.compatibility(), CompatibilityStatus::Compatible);
}

#[test]
fn missing_descriptor_is_a_configuration_error() {
    let board = Board::new();
    std::fs::remove_file(board.dir.path().join("map.csv")).unwrap();

    let err = board.activate("Leaflet V78.0").unwrap_err();
    assert!(matches!(err, BspError::Configuration(_)), "{err}");
}

// ─── Claims and resolution ──────────────────────────────────────────

#[test]
fn relay_claim_resolves_its_coil() {
    let board = Board::new();
    let core = board.core();
    let pin = PinIdentity::new(ModuleType::Rel, 1, 1);

    let claim = core.claim_pin(pin, "relay0").unwrap();
    assert_eq!(core.resolve_for_type(pin), Ok(10));
    assert_eq!(
        core.resolve(pin, AddressSpace::DiscreteOutputCoil),
        Ok(10)
    );
    assert_eq!(core.allocator().owner_of(pin).as_deref(), Some("relay0"));

    drop(claim);
    assert_eq!(core.allocator().owner_of(pin), None);
}

#[test]
fn second_claimant_is_refused_and_owner_keeps_the_pin() {
    let board = Board::new();
    let core = board.core();
    let pin = PinIdentity::new(ModuleType::Rel, 1, 1);

    let _first = core.claim_pin(pin, "relay0").unwrap();
    let err = core.claim_pin(pin, "relay1").unwrap_err();

    assert_eq!(
        err,
        BspError::AllocationConflict {
            pin,
            owner: "relay0".to_string()
        }
    );
    assert_eq!(core.allocator().owner_of(pin).as_deref(), Some("relay0"));
}

#[test]
fn claims_follow_presence_changes() {
    let board = Board::new();
    let core = board.core();
    let pin = PinIdentity::new(ModuleType::Rel, 3, 1);

    let err = core.claim_pin(pin, "relay-late").unwrap_err();
    assert!(matches!(err, BspError::ModuleNotPresent { .. }));

    board.bus.set_input_register(PRESENCE_REL, 0b111);
    cycle(&core);
    assert!(core.claim_pin(pin, "relay-late").is_ok());
}

#[test]
fn existing_claim_survives_module_removal() {
    let board = Board::new();
    let core = board.core();
    let pin = PinIdentity::new(ModuleType::Rel, 2, 1);
    let _claim = core.claim_pin(pin, "relay2").unwrap();

    board.bus.set_input_register(PRESENCE_REL, 0b01);
    cycle(&core);

    assert!(!core.is_present(ModuleType::Rel, 2));
    assert_eq!(core.allocator().owner_of(pin).as_deref(), Some("relay2"));
    let err = core
        .claim_pin(PinIdentity::new(ModuleType::Rel, 2, 2), "relay3")
        .unwrap_err();
    assert!(matches!(err, BspError::ModuleNotPresent { .. }));
}

#[test]
fn gpio_resolves_through_the_carrier_board() {
    let board = Board::new();
    let core = board.core();
    let pin = PinIdentity::new(ModuleType::Gpio, 0, 3);

    assert!(core.claim_pin(pin, "button").is_ok());
    assert_eq!(core.resolve_for_type(pin), Ok(40));
}

#[test]
fn aio_has_no_primary_function() {
    let board = Board::new();
    let core = board.core();
    let pin = PinIdentity::new(ModuleType::Aio, 1, 1);

    assert_eq!(
        core.resolve_for_type(pin),
        Err(BspError::UnsupportedModuleType {
            module_type: ModuleType::Aio
        })
    );
    assert_eq!(core.resolve_aio(pin, AioDirection::Input), Ok(60));
    assert_eq!(core.resolve_aio(pin, AioDirection::Output), Ok(60));
}

#[test]
fn unmapped_pin_names_pin_and_space() {
    let board = Board::new();
    let core = board.core();
    let pin = PinIdentity::new(ModuleType::Rel, 1, 9);

    let err = core.resolve_for_type(pin).unwrap_err();
    assert_eq!(
        err,
        BspError::UnknownAddress {
            pin,
            space: AddressSpace::DiscreteOutputCoil
        }
    );
}

// ─── Configuration mode ─────────────────────────────────────────────

#[test]
fn protected_write_enters_and_leaves_config_mode_once() {
    let board = Board::new();
    let core = board.core();

    core.invert_relay(1, 1).unwrap();
    assert_eq!(core.config_mode(), ConfigModeState::ConfigPending);
    assert_eq!(board.bus.holding_writes(CONFIG_MODE_REGISTER), vec![1337]);

    // Cycle 1 flushes the setting, cycle 2 sees it read back and exits.
    cycle(&core);
    assert_eq!(board.bus.holding_writes(RELAY_CONFIG_REGISTER), vec![0b1]);
    assert_eq!(core.config_mode(), ConfigModeState::ConfigPending);
    cycle(&core);
    assert_eq!(core.config_mode(), ConfigModeState::Idle);

    for _ in 0..5 {
        cycle(&core);
    }
    assert_eq!(
        board.bus.holding_writes(CONFIG_MODE_REGISTER),
        vec![1337, 7331]
    );
    assert_eq!(core.coordinator().exit_count(), 1);
}

#[test]
fn settings_of_one_module_accumulate_into_one_word() {
    let board = Board::new();
    let core = board.core();

    core.invert_relay(1, 1).unwrap();
    core.invert_relay(1, 2).unwrap();
    cycle(&core);
    assert_eq!(board.bus.holding_writes(RELAY_CONFIG_REGISTER), vec![0b11]);

    cycle(&core);
    core.revert_relay_inversion(1, 1).unwrap();
    cycle(&core);
    assert_eq!(
        board.bus.holding_writes(RELAY_CONFIG_REGISTER),
        vec![0b11, 0b10]
    );
}

#[test]
fn out_of_range_settings_stage_nothing() {
    let board = Board::new();
    let core = board.core();

    assert!(matches!(
        core.set_pwm_frequency(1, 23),
        Err(BspError::InvalidSetting(_))
    ));
    assert!(matches!(
        core.invert_relay(1, 17),
        Err(BspError::InvalidSetting(_))
    ));
    assert_eq!(core.config_mode(), ConfigModeState::Idle);
    assert_eq!(core.coordinator().staged_count(), 0);
}

#[test]
fn stuck_setting_keeps_config_mode_until_deactivation() {
    let board = Board::new();
    let core = board.core();
    board.bus.freeze_holding_register(PWM_CONFIG_REGISTER);

    core.set_pwm_frequency(1, 200).unwrap();
    for _ in 0..4 {
        cycle(&core);
    }
    assert_eq!(core.config_mode(), ConfigModeState::ConfigPending);

    core.deactivate().unwrap();
    assert_eq!(core.config_mode(), ConfigModeState::Idle);
    assert_eq!(
        board.bus.holding_writes(CONFIG_MODE_REGISTER),
        vec![1337, 7331]
    );
}

#[test]
fn deactivation_reports_a_dead_bus() {
    let board = Board::new();
    let core = board.core();

    core.set_aio_mode(1, 1, AioMode::VoltageIn).unwrap();
    board.bus.set_fail_writes(true);

    let err = core.deactivate().unwrap_err();
    assert!(matches!(err, BspError::Bus(_)));
    assert_eq!(core.config_mode(), ConfigModeState::ConfigPending);

    board.bus.set_fail_writes(false);
    core.deactivate().unwrap();
    assert_eq!(core.config_mode(), ConfigModeState::Idle);
}

#[test]
fn dropping_the_core_leaves_config_mode() {
    let board = Board::new();
    let core = board.activate("Leaflet V78.0").unwrap();

    core.set_pwm_frequency(1, 500).unwrap();
    drop(core);

    assert_eq!(
        board.bus.holding_writes(CONFIG_MODE_REGISTER),
        vec![1337, 7331]
    );
}

#[test]
fn deactivating_an_idle_board_writes_nothing() {
    let board = Board::new();
    let core = board.core();

    core.deactivate().unwrap();
    assert!(board.bus.holding_writes(CONFIG_MODE_REGISTER).is_empty());
}

// ─── Runner ─────────────────────────────────────────────────────────

#[test]
fn runner_drives_config_mode_to_idle() {
    let board = Board::new();
    let core = board.core();
    core.invert_relay(2, 1).unwrap_err();
    core.invert_relay(1, 4).unwrap();

    let mut runner = CycleRunner::new(Arc::clone(&core), Duration::from_millis(1));
    runner.run(Some(3));

    assert_eq!(runner.stats().cycle_count, 3);
    assert_eq!(core.config_mode(), ConfigModeState::Idle);
    assert_eq!(board.bus.holding_writes(RELAY_CONFIG_REGISTER), vec![0b1000]);
}

#[test]
fn core_counts_cycles_and_uptime() {
    let board = Board::new();
    let core = board.core();
    assert_eq!(core.cycle_count(), 0);

    let mut runner = CycleRunner::new(Arc::clone(&core), Duration::from_millis(2));
    runner.run(Some(4));

    assert_eq!(core.cycle_count(), 4);
    assert!(core.uptime() >= Duration::from_millis(6));
}
