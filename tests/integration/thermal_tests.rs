//! Thermal interlock through the housekeeping tick.

use crate::mock_hw::{booted, config_with, poll, server_went_idle};

use smartrelay::app::commands::AppCommand;
use smartrelay::app::events::AppEvent;
use smartrelay::app::lifecycle::ServiceFlag;

fn tripped(h: &crate::mock_hw::Harness) -> usize {
    h.sink.count(|e| matches!(e, AppEvent::OverheatTripped(_)))
}

#[test]
fn trip_stops_service_and_forces_outputs_off() {
    let (mut app, board, mut h) = booted(config_with(&[0, 0]), 2);
    for id in 0..2 {
        app.handle_command(AppCommand::SetSwitch { id, on: true }, &mut h.ports())
            .unwrap();
    }

    board.temperature.set(Some(95.0));
    poll(&mut app, &mut h, 1000);

    assert!(app.is_overheated());
    assert!(app.has_service_flag(ServiceFlag::Overheat));
    assert_eq!(h.server.stops(), 1);
    for id in 0..2 {
        assert!(!board.output(id));
        assert_eq!(
            board.output_sources[id].borrow().last().map(String::as_str),
            Some("OVH")
        );
    }
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::OverheatTripped(95))), 1);
}

#[test]
fn hysteresis_holds_until_release_threshold() {
    let (mut app, board, mut h) = booted(config_with(&[0]), 1);
    let reg_temp = board.temperature.clone();
    let mut now = 1000;

    reg_temp.set(Some(90.0));
    poll(&mut app, &mut h, now);
    assert!(app.is_overheated(), "trip threshold is inclusive");
    server_went_idle(&mut app, &mut h, now + 500);

    for t in [95.0, 80.0, 76.0] {
        now += 1000;
        reg_temp.set(Some(t));
        poll(&mut app, &mut h, now);
        assert!(app.is_overheated(), "still latched at {t}");
    }
    assert_eq!(tripped(&h), 1, "further high readings are ignored");
    assert_eq!(h.server.starts(), 1);

    now += 1000;
    reg_temp.set(Some(75.0));
    poll(&mut app, &mut h, now);
    assert!(!app.is_overheated(), "release threshold is inclusive");
    assert!(!app.has_service_flag(ServiceFlag::Overheat));
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::OverheatCleared(75))), 1);

    // The start attempt precedes the thermal check, so the restart lands
    // one tick after recovery.
    assert_eq!(h.server.starts(), 1);
    now += 1000;
    poll(&mut app, &mut h, now);
    assert_eq!(h.server.starts(), 2);
}

#[test]
fn failed_read_takes_no_action() {
    let (mut app, board, mut h) = booted(config_with(&[0]), 1);
    board.temperature.set(None);
    poll(&mut app, &mut h, 1000);

    assert!(!app.is_overheated());
    assert_eq!(app.last_temperature(), None);
    assert_eq!(h.server.stops(), 0);
    assert_eq!(tripped(&h), 0);
}

#[test]
fn outputs_stay_controllable_after_recovery() {
    let (mut app, board, mut h) = booted(config_with(&[0]), 1);
    board.temperature.set(Some(100.0));
    poll(&mut app, &mut h, 1000);
    board.temperature.set(Some(30.0));
    poll(&mut app, &mut h, 2000);

    app.handle_command(AppCommand::SetSwitch { id: 0, on: true }, &mut h.ports())
        .unwrap();
    assert!(board.output(0));
}

#[test]
fn trip_while_unprovisioned_skips_stop_but_forces_outputs_off() {
    let (reg, board) = crate::mock_hw::registry(1);
    let mut app = smartrelay::app::service::AppService::new(config_with(&[0]), reg);
    let mut h = crate::mock_hw::Harness::new();
    h.server.provisioned = false;
    app.boot(0, &mut h.ports());
    app.handle_command(AppCommand::SetSwitch { id: 0, on: true }, &mut h.ports())
        .unwrap();
    assert!(board.output(0));

    board.temperature.set(Some(95.0));
    poll(&mut app, &mut h, 1000);

    assert!(app.is_overheated());
    assert_eq!(h.server.starts(), 0);
    assert_eq!(h.server.stops(), 0, "an idle server is not asked to stop");
    assert!(!board.output(0));
    assert_eq!(
        board.output_sources[0].borrow().last().map(String::as_str),
        Some("OVH")
    );
}
