//! Physical button gestures: switch cycling, held indication and the
//! long-press network reset.

use crate::mock_hw::{Harness, LedCall, booted, config_with, poll};

use smartrelay::app::events::{AppEvent, PlatformEvent};
use smartrelay::app::service::AppService;
use smartrelay::peripherals::InputEvent;

fn press(app: &mut AppService, h: &mut Harness, event: InputEvent, pressed: bool, now_ms: u64) {
    app.post(PlatformEvent::Button { event, pressed });
    poll(app, h, now_ms);
}

#[test]
fn single_press_counts_through_switch_states() {
    // Two switches and an outlet: only the switches take part.
    let (mut app, board, mut h) = booted(config_with(&[0, 0, 1]), 3);

    let expected = [(true, false), (false, true), (true, true), (false, false)];
    for (i, (s0, s1)) in expected.into_iter().enumerate() {
        press(&mut app, &mut h, InputEvent::Single, false, 10 * (i as u64 + 1));
        assert_eq!((board.output(0), board.output(1)), (s0, s1), "press {}", i + 1);
        assert!(!board.output(2), "outlet is never cycled");
    }

    // 1 + 2 + 1 + 2 bit flips.
    assert_eq!(
        h.sink.count(|e| matches!(e, AppEvent::SwitchChanged { source: "btn", .. })),
        6
    );
}

#[test]
fn single_press_without_switches_does_nothing() {
    let (mut app, board, mut h) = booted(config_with(&[1]), 1);
    press(&mut app, &mut h, InputEvent::Single, false, 10);
    assert!(!board.output(0));
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::SwitchChanged { .. })), 0);
}

#[test]
fn held_button_lights_led_solid() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);

    press(&mut app, &mut h, InputEvent::Change, true, 10);
    assert_eq!(
        h.led.calls[h.led.calls.len() - 2..],
        [LedCall::Blink(0, 0), LedCall::Level(true)]
    );

    press(&mut app, &mut h, InputEvent::Change, false, 20);
    assert_eq!(h.led.last(), Some(LedCall::Release));
}

#[test]
fn long_press_resets_network_after_delay() {
    let mut config = config_with(&[0]);
    config.network.sta_enable = true;
    config.network.ssid = heapless::String::try_from("home").unwrap();
    let (mut app, _board, mut h) = booted(config, 1);

    press(&mut app, &mut h, InputEvent::Long, true, 100);
    assert_eq!(h.led.last(), Some(LedCall::Blink(100, 100)));
    assert!(app.is_reset_pending());

    poll(&mut app, &mut h, 699);
    assert!(h.network.applied.is_empty(), "reset fires 600 ms after the press");

    poll(&mut app, &mut h, 700);
    assert!(!app.is_reset_pending());
    assert_eq!(h.network.applied.len(), 1);
    let applied = &h.network.applied[0];
    assert!(!applied.sta_enable);
    assert!(applied.ap_enable);

    let saved = h.config.last_saved().expect("reset is persisted");
    assert!(!saved.network.sta_enable);
    assert!(saved.network.ap_enable);
    assert_eq!(saved.network.ssid.as_str(), "home", "credentials are kept");

    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::NetworkReset)), 1);
    assert_eq!(h.led.last_blink(), Some((100, 100)));
}

#[test]
fn repeated_long_press_schedules_one_reset() {
    let (mut app, _board, mut h) = booted(config_with(&[0]), 1);

    press(&mut app, &mut h, InputEvent::Long, true, 100);
    press(&mut app, &mut h, InputEvent::Long, true, 300);
    poll(&mut app, &mut h, 1000);
    poll(&mut app, &mut h, 2000);

    assert_eq!(h.network.applied.len(), 1);
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::NetworkReset)), 1);
}

#[test]
fn reset_without_led_still_applies() {
    let mut config = config_with(&[0]);
    config.status_led.gpio = -1;
    let (mut app, _board, mut h) = booted(config, 1);

    press(&mut app, &mut h, InputEvent::Long, true, 0);
    poll(&mut app, &mut h, 600);

    assert_eq!(h.network.applied.len(), 1);
    assert!(h.led.calls.is_empty());
}
