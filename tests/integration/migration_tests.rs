//! Boot-time configuration migration against a recording config store.

use crate::mock_hw::MockConfig;

use smartrelay::config::{DeviceConfig, InitialState, SwitchConfig, name};
use smartrelay::migrate::{CURRENT_CONFIG_VERSION, MigrationEnv, migrate};

const MAC: [u8; 6] = [0x24, 0x0A, 0xC4, 0x12, 0x34, 0x56];

fn v0() -> DeviceConfig {
    let mut c = DeviceConfig::default();
    c.cfg_version = 0;
    c.device_id = name("kitchen-relay");
    c.switches[0].persist_state = true;
    c.switches[0].state = true;
    c.switches.push(SwitchConfig::new(1, 1)).unwrap();
    c
}

#[test]
fn every_step_is_persisted() {
    let port = MockConfig::default();
    let mut c = v0();
    let env = MigrationEnv { paired: true, mac: MAC };

    assert!(migrate(&mut c, &env, &port));
    assert_eq!(c.cfg_version, CURRENT_CONFIG_VERSION);

    let versions: Vec<u32> = port.saved.borrow().iter().map(|s| s.cfg_version).collect();
    assert_eq!(versions, vec![1, 2, 3]);

    let last = port.last_saved().unwrap();
    assert_eq!(last, c);
    assert_eq!(last.switches[0].initial_state, InitialState::Last);
    assert!(last.switches[0].state);
    assert!(last.legacy_hap_layout);
    assert_eq!(last.name.as_str(), "kitchen-relay");
    assert_eq!(last.device_id.as_str(), "smartrelay-123456");
}

#[test]
fn interrupted_migration_resumes_from_stored_version() {
    let port = MockConfig::default();
    let env = MigrationEnv { paired: false, mac: MAC };

    let mut c = v0();
    c.cfg_version = 2;
    assert!(migrate(&mut c, &env, &port));
    assert_eq!(port.saves(), 1);
    // Step 0 → 1 never ran for this record.
    assert_eq!(c.switches[0].initial_state, InitialState::Off);
    assert!(!c.legacy_hap_layout);
}

#[test]
fn current_config_is_left_alone() {
    let port = MockConfig::default();
    let mut c = DeviceConfig::default();
    let env = MigrationEnv { paired: true, mac: MAC };
    assert!(!migrate(&mut c, &env, &port));
    assert_eq!(port.saves(), 0);
}

#[test]
fn save_failure_does_not_stop_migration() {
    let port = MockConfig::default();
    port.fail.set(true);
    let mut c = v0();
    let env = MigrationEnv { paired: false, mac: MAC };

    assert!(migrate(&mut c, &env, &port));
    assert_eq!(c.cfg_version, CURRENT_CONFIG_VERSION);
    assert_eq!(port.saves(), 0);
}

#[test]
fn power_loss_mid_migration_converges() {
    let env = MigrationEnv { paired: true, mac: MAC };

    let straight = MockConfig::default();
    let mut expected = v0();
    migrate(&mut expected, &env, &straight);

    // First boot only gets one step persisted before power is lost.
    let port = MockConfig::default();
    let mut first = v0();
    assert!(smartrelay::migrate::migrate_step(&mut first, &env));
    port.saved.borrow_mut().push(first);

    // Second boot resumes from what was stored.
    let mut resumed = smartrelay::app::ports::ConfigPort::load(&port).unwrap();
    assert_eq!(resumed.cfg_version, 1);
    migrate(&mut resumed, &env, &port);

    assert_eq!(resumed, expected);
}
