//! Integration tests for the AppService → lifecycle → server pipeline.
//!
//! Boot, start/stop/teardown, commands, persistence and the update hooks,
//! all against the recording mocks in `mock_hw`.

use crate::mock_hw::{ServerCall, booted, config_with, poll, run_ticks, server_went_idle};

use smartrelay::app::commands::AppCommand;
use smartrelay::app::events::{AppEvent, PlatformEvent, UpdateDecision, UpdateStatus};
use smartrelay::app::lifecycle::ServiceFlag;
use smartrelay::app::service::APP_NAME;
use smartrelay::config::{InMode, InitialState, StatelessSwitchConfig, name};
use smartrelay::peripherals::InputEvent;

// ── Boot and topology ────────────────────────────────────────

#[test]
fn boot_starts_bridge_with_dedicated_outlet_accessory() {
    let (_app, _board, h) = booted(config_with(&[1]), 1);

    assert_eq!(
        h.server.calls,
        vec![ServerCall::StartBridge {
            aids: vec![1, 0x200]
        }]
    );
    assert_eq!(
        h.sink.count(|e| matches!(
            e,
            AppEvent::ServiceStarted {
                bridge: true,
                accessories: 2,
                cn: 1
            }
        )),
        1
    );
    assert!(matches!(h.sink.events[0], AppEvent::Started { .. }));
}

#[test]
fn legacy_layout_starts_single_accessory() {
    let mut config = config_with(&[0, 0]);
    config.legacy_hap_layout = true;
    let (app, _board, h) = booted(config, 2);

    assert!(matches!(h.server.calls[..], [ServerCall::Start { aid: 1, .. }]));
    assert_eq!(app.catalog().accessories().len(), 1);
    assert_eq!(app.catalog().components().len(), 2);
}

#[test]
fn unprovisioned_server_is_started_by_a_later_tick() {
    let (reg, _board) = crate::mock_hw::registry(1);
    let mut app = smartrelay::app::service::AppService::new(config_with(&[0]), reg);
    let mut h = crate::mock_hw::Harness::new();
    h.server.provisioned = false;
    app.boot(0, &mut h.ports());

    assert_eq!(h.server.starts(), 0);
    assert!(!app.catalog().is_empty(), "catalog is built even when unprovisioned");

    h.server.provisioned = true;
    poll(&mut app, &mut h, 1000);
    assert_eq!(h.server.starts(), 1);
}

// ── Teardown and rebuild ─────────────────────────────────────

#[test]
fn idle_tears_down_catalog_and_rebuild_keeps_outputs() {
    let mut config = config_with(&[0]);
    config.switches[0].initial_state = InitialState::On;
    let (mut app, board, mut h) = booted(config, 1);
    assert!(board.output(0), "initial state applied on first build");

    app.handle_command(AppCommand::StopService, &mut h.ports())
        .unwrap();
    assert_eq!(h.server.stops(), 1);
    assert!(!app.catalog().is_empty(), "catalog survives until Idle");

    server_went_idle(&mut app, &mut h, 500);
    assert!(app.catalog().is_empty());
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::CatalogCleared)), 1);

    board.outputs[0].set(false);
    poll(&mut app, &mut h, 1000);
    assert_eq!(h.server.starts(), 2);
    assert!(!board.output(0), "rebuild must not reapply the initial state");
    let inits = board.output_sources[0]
        .borrow()
        .iter()
        .filter(|s| *s == "init")
        .count();
    assert_eq!(inits, 1);
}

#[test]
fn restart_bumps_configuration_number_and_restarts() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);

    app.handle_command(AppCommand::RestartService, &mut h.ports())
        .unwrap();
    assert_eq!(
        h.server.calls[1..],
        [ServerCall::Stop, ServerCall::IncrementCn]
    );

    server_went_idle(&mut app, &mut h, 500);
    poll(&mut app, &mut h, 1000);
    assert_eq!(h.server.starts(), 2);
    assert!(matches!(
        h.sink.events.last(),
        Some(AppEvent::ServiceStarted { cn: 2, .. })
    ));
}

#[test]
fn start_command_is_not_blocked_by_running_server() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);
    app.handle_command(AppCommand::StartService, &mut h.ports())
        .unwrap();
    assert_eq!(h.server.starts(), 1);
}

// ── Commands ─────────────────────────────────────────────────

#[test]
fn set_switch_drives_output_and_reports_rpc_source() {
    let (mut app, board, mut h) = booted(config_with(&[0]), 1);

    app.handle_command(AppCommand::SetSwitch { id: 0, on: true }, &mut h.ports())
        .unwrap();
    assert!(board.output(0));
    // Unchanged state emits nothing.
    app.handle_command(AppCommand::SetSwitch { id: 0, on: true }, &mut h.ports())
        .unwrap();

    let changes = h.sink.count(|e| {
        matches!(
            e,
            AppEvent::SwitchChanged {
                id: 0,
                state: true,
                source: "rpc"
            }
        )
    });
    assert_eq!(changes, 1);
}

#[test]
fn set_switch_rejects_unknown_id() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);
    let result = app.handle_command(AppCommand::SetSwitch { id: 3, on: true }, &mut h.ports());
    assert!(result.is_err());
}

#[test]
fn identify_request_blinks_for_three_evaluations() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);

    app.post(PlatformEvent::Identify { aid: 1 });
    poll(&mut app, &mut h, 10);
    assert_eq!(h.led.last_blink(), Some((100, 100)));

    run_ticks(&mut app, &mut h, 1, 2);
    assert_eq!(h.led.last_blink(), Some((100, 100)));

    run_ticks(&mut app, &mut h, 3, 3);
    assert_eq!(h.led.last(), Some(crate::mock_hw::LedCall::Release));
}

// ── Housekeeping ─────────────────────────────────────────────

#[test]
fn status_report_every_eight_ticks() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);
    run_ticks(&mut app, &mut h, 1, 16);

    assert_eq!(app.tick_count(), 16);
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::Status(_))), 2);
    let Some(AppEvent::Status(report)) = h
        .sink
        .events
        .iter()
        .rev()
        .find(|e| matches!(e, AppEvent::Status(_)))
    else {
        panic!("no status report");
    };
    assert_eq!(report.temperature_c, Some(25));
    assert_eq!(report.components, "0.0: st:0");
}

#[test]
fn last_state_switch_is_auto_saved_after_five_seconds() {
    let mut config = config_with(&[0]);
    config.switches[0].initial_state = InitialState::Last;
    let (mut app, board, mut h) = booted(config, 1);

    app.post(PlatformEvent::Input {
        id: 0,
        event: InputEvent::Single,
        level: false,
    });
    poll(&mut app, &mut h, 100);
    assert!(board.output(0));
    assert!(app.is_config_dirty());
    assert_eq!(
        h.sink.count(|e| matches!(e, AppEvent::SwitchChanged { source: "ext", .. })),
        1
    );

    run_ticks(&mut app, &mut h, 1, 5);
    assert_eq!(h.config.saves(), 0, "dirty for less than 5 s");

    run_ticks(&mut app, &mut h, 6, 6);
    assert_eq!(h.config.saves(), 1);
    let saved = h.config.last_saved().unwrap();
    assert!(saved.switch(0).unwrap().state);
    assert!(!app.is_config_dirty());
}

#[test]
fn plain_switch_changes_do_not_dirty_config() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);
    app.handle_command(AppCommand::SetSwitch { id: 0, on: true }, &mut h.ports())
        .unwrap();
    assert!(!app.is_config_dirty());
}

#[test]
fn legacy_layout_is_dropped_once_unpaired() {
    let mut config = config_with(&[0, 0]);
    config.legacy_hap_layout = true;
    let (mut app, _board, mut h) = booted(config, 2);
    h.server.paired = false;

    poll(&mut app, &mut h, 1000);
    assert!(!app.config().legacy_hap_layout);
    assert!(!h.config.last_saved().unwrap().legacy_hap_layout);
    assert!(h.server.calls.contains(&ServerCall::IncrementCn));

    server_went_idle(&mut app, &mut h, 1500);
    poll(&mut app, &mut h, 2000);
    assert_eq!(
        h.server.calls.last(),
        Some(&ServerCall::StartBridge {
            aids: vec![1, 0x100, 0x101]
        })
    );
}

#[test]
fn detached_input_reports_programmable_switch_press() {
    let mut config = config_with(&[0]);
    config.switches[0].in_mode = InMode::Detached;
    config
        .stateless_switches
        .push(StatelessSwitchConfig {
            id: 0,
            name: name("Button 1"),
        })
        .unwrap();
    let (mut app, board, mut h) = booted(config, 1);

    assert_eq!(
        h.server.calls,
        vec![ServerCall::StartBridge {
            aids: vec![1, 0x100, 0x400]
        }]
    );

    app.post(PlatformEvent::Input {
        id: 0,
        event: InputEvent::Single,
        level: true,
    });
    poll(&mut app, &mut h, 10);

    assert_eq!(
        h.sink.count(|e| matches!(
            e,
            AppEvent::ProgrammableSwitch {
                id: 0,
                press: InputEvent::Single
            }
        )),
        1
    );
    assert!(!board.output(0), "detached input leaves the relay alone");
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::SwitchChanged { .. })), 0);
}

// ── Reboot ───────────────────────────────────────────────────

#[test]
fn reboot_stops_service_saves_and_blocks_restart() {
    let mut config = config_with(&[0]);
    config.switches[0].initial_state = InitialState::Last;
    let (mut app, _board, mut h) = booted(config, 1);

    app.post(PlatformEvent::Input {
        id: 0,
        event: InputEvent::Single,
        level: false,
    });
    app.post(PlatformEvent::Reboot);
    poll(&mut app, &mut h, 100);

    assert!(app.has_service_flag(ServiceFlag::RebootPending));
    assert_eq!(h.server.stops(), 1);
    assert_eq!(h.config.saves(), 1, "dirty config flushed before reboot");

    server_went_idle(&mut app, &mut h, 200);
    run_ticks(&mut app, &mut h, 1, 3);
    assert_eq!(h.server.starts(), 1);
}

// ── Firmware update hooks ────────────────────────────────────

#[test]
fn update_with_wrong_app_name_is_aborted() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);
    let d = app.on_update_begin("other-firmware", UpdateDecision::Proceed, &mut h.ports());
    assert_eq!(d, UpdateDecision::Abort);
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::UpdateRejected)), 1);
    assert!(!app.has_service_flag(ServiceFlag::FirmwareUpdate));
}

#[test]
fn update_waits_for_server_to_stop() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);

    let d = app.on_update_begin(APP_NAME, UpdateDecision::Proceed, &mut h.ports());
    assert_eq!(d, UpdateDecision::Wait);
    assert_eq!(h.server.stops(), 1);
    assert!(app.has_service_flag(ServiceFlag::FirmwareUpdate));

    server_went_idle(&mut app, &mut h, 100);
    let d = app.on_update_begin(APP_NAME, UpdateDecision::Proceed, &mut h.ports());
    assert_eq!(d, UpdateDecision::Proceed);

    // Flag holds the server down while the image is written.
    run_ticks(&mut app, &mut h, 1, 2);
    assert_eq!(h.server.starts(), 1);
}

#[test]
fn prior_hook_objection_passes_through() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);
    let d = app.on_update_begin(APP_NAME, UpdateDecision::Abort, &mut h.ports());
    assert_eq!(d, UpdateDecision::Abort);
    assert_eq!(h.server.stops(), 0);
    assert!(!app.has_service_flag(ServiceFlag::FirmwareUpdate));
}

#[test]
fn failed_update_clears_flag_and_service_resumes() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);
    app.on_update_begin(APP_NAME, UpdateDecision::Proceed, &mut h.ports());
    server_went_idle(&mut app, &mut h, 100);

    app.post(PlatformEvent::UpdateStatus(UpdateStatus::Error));
    poll(&mut app, &mut h, 200);
    assert!(!app.has_service_flag(ServiceFlag::FirmwareUpdate));

    poll(&mut app, &mut h, 1000);
    assert_eq!(h.server.starts(), 2);
}

#[test]
fn start_is_refused_while_any_flag_is_set() {
    let (mut app, board, mut h) = booted(config_with(&[0]), 1);
    board.temperature.set(Some(120.0));
    poll(&mut app, &mut h, 1000);
    server_went_idle(&mut app, &mut h, 1500);

    h.server.provisioned = false;
    assert!(!app.start_service(false, &mut h.ports()));
    h.server.provisioned = true;
    assert!(!app.start_service(false, &mut h.ports()));
    assert!(app.catalog().is_empty(), "no rebuild while flagged");
    assert_eq!(h.server.starts(), 1);
}

// ── Diagnostics ──────────────────────────────────────────────

#[test]
fn diagnostics_queries() {
    let (mut app, _board, mut h) = booted(config_with(&[0, 1]), 2);
    app.handle_command(AppCommand::SetSwitch { id: 1, on: true }, &mut h.ports())
        .unwrap();

    assert!(app.find_output(1).is_some_and(|o| o.state()));
    assert!(app.find_input(0).is_some());
    assert!(app.find_power_meter(0).is_none());
    assert_eq!(app.system_temperature(), Ok(25));
    assert_eq!(app.component_status(), "0.0: st:0; 1.1: st:1");
    assert_eq!(app.service_flags(), 0);

    let m = app.metrics(&h.server);
    assert_eq!(m.components, 2);
    assert_eq!(m.accessories, 3);
    assert!(m.to_json().unwrap().contains("\"overheated\":false"));
}

#[test]
fn temperature_query_without_sensor_is_not_found() {
    let mut app = smartrelay::app::service::AppService::new(
        config_with(&[]),
        smartrelay::peripherals::PeripheralRegistry::new(),
    );
    assert_eq!(
        app.system_temperature(),
        Err(smartrelay::error::TemperatureError::NotFound)
    );
}
