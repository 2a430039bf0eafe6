//! Status LED patterns as driven by the service.

use crate::mock_hw::{Harness, LedCall, booted, config_with, poll, registry, run_ticks};

use smartrelay::app::events::UpdateDecision;
use smartrelay::app::indicator::BlinkPattern;
use smartrelay::app::ports::LinkState;
use smartrelay::app::service::{APP_NAME, AppService};

#[test]
fn healthy_device_releases_led() {
    let (app, _board, h) = booted(config_with(&[0]), 1);
    assert_eq!(h.led.calls, vec![LedCall::Release]);
    assert_eq!(app.applied_pattern(), Some(BlinkPattern::OFF));
}

#[test]
fn connecting_link_blinks_and_settles() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);

    h.network.link = LinkState::Connecting;
    poll(&mut app, &mut h, 1000);
    assert_eq!(h.led.last(), Some(LedCall::Blink(200, 200)));

    // Same pattern on the next tick: hardware is not re-programmed.
    let n = h.led.calls.len();
    poll(&mut app, &mut h, 2000);
    assert_eq!(h.led.calls.len(), n);

    h.network.link = LinkState::IpAcquired;
    poll(&mut app, &mut h, 3000);
    assert_eq!(h.led.last(), Some(LedCall::Release));
}

#[test]
fn unprovisioned_server_blinks_short_flash() {
    let (reg, _board) = registry(1);
    let mut app = AppService::new(config_with(&[0]), reg);
    let mut h = Harness::new();
    h.server.provisioned = false;
    app.boot(0, &mut h.ports());

    assert_eq!(h.led.last(), Some(LedCall::Blink(25, 875)));
}

#[test]
fn access_point_mode_blinks_long_flash() {
    let mut config = config_with(&[0]);
    config.network.ap_enable = true;
    let (_app, _board, h) = booted(config, 1);
    assert_eq!(h.led.last(), Some(LedCall::Blink(875, 25)));
}

#[test]
fn unpaired_server_blinks_pairing_pattern() {
    let (reg, _board) = registry(1);
    let mut app = AppService::new(config_with(&[0]), reg);
    let mut h = Harness::new();
    h.server.paired = false;
    app.boot(0, &mut h.ports());

    assert_eq!(h.led.last(), Some(LedCall::Blink(500, 500)));
}

#[test]
fn update_in_progress_beats_stopped_server() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);
    assert_eq!(
        app.on_update_begin(APP_NAME, UpdateDecision::Proceed, &mut h.ports()),
        UpdateDecision::Wait
    );
    run_ticks(&mut app, &mut h, 1, 1);
    assert_eq!(h.led.last(), Some(LedCall::Blink(250, 250)));
}

#[test]
fn board_without_led_is_never_driven() {
    let mut config = config_with(&[0]);
    config.status_led.gpio = -1;
    let (mut app, _board, mut h) = booted(config, 1);

    h.network.link = LinkState::Connecting;
    run_ticks(&mut app, &mut h, 1, 3);
    assert!(h.led.calls.is_empty());
}
