//! Debounced digital input with gesture classification.
//!
//! Used for the switch terminals and for the physical button.  The pin is
//! sampled from the main loop; `poll()` runs the debounce filter and the
//! gesture state machine.
//!
//! ## Gesture detection
//!
//! | Gesture | Condition                                           | Event    |
//! |---------|-----------------------------------------------------|----------|
//! | Change  | Debounced level differs from the previous one       | `Change` |
//! | Single  | Release < short-press, no second press < 300 ms     | `Single` |
//! | Double  | Second short press within 300 ms of the first       | `Double` |
//! | Long    | Held >= long-press (fires once while held)          | `Long`   |

use embedded_hal::digital::InputPin as HalInputPin;
use log::warn;

use crate::config::ButtonConfig;
use crate::peripherals::{Input, InputEvent, InputEvents};

const DEBOUNCE_MS: u64 = 50;
const DOUBLE_PRESS_WINDOW_MS: u64 = 300;

/// Press timing thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressTiming {
    pub short_press_ms: u64,
    pub long_press_ms: u64,
}

impl PressTiming {
    pub fn from_button(cfg: &ButtonConfig) -> Self {
        Self {
            short_press_ms: u64::from(cfg.short_press_ms),
            long_press_ms: u64::from(cfg.long_press_ms),
        }
    }
}

impl Default for PressTiming {
    fn default() -> Self {
        Self {
            short_press_ms: 500,
            long_press_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Idle,
    Pressed {
        since_ms: u64,
        second: bool,
        long_fired: bool,
    },
    WaitSecondPress {
        released_ms: u64,
    },
}

/// A GPIO input behind the `embedded-hal` digital trait.
pub struct InputPin<P> {
    id: i32,
    pin: P,
    active_level: bool,
    timing: PressTiming,
    raw: bool,
    raw_since_ms: u64,
    level: bool,
    gesture: Gesture,
}

impl<P: HalInputPin> InputPin<P> {
    /// `active_level` is the electrical level that counts as "pressed/on".
    ///
    /// The pin is sampled once here so `state()` reports the live level
    /// before the first `poll()`; that seed does not produce a `Change`.
    pub fn new(id: i32, pin: P, active_level: bool, timing: PressTiming) -> Self {
        let mut input = Self {
            id,
            pin,
            active_level,
            timing,
            raw: false,
            raw_since_ms: 0,
            level: false,
            gesture: Gesture::Idle,
        };
        let seed = input.sample().unwrap_or(false);
        input.raw = seed;
        input.level = seed;
        input
    }

    fn sample(&mut self) -> Option<bool> {
        match self.pin.is_high() {
            Ok(high) => Some(high == self.active_level),
            Err(_) => {
                warn!("Input {}: GPIO read failed", self.id);
                None
            }
        }
    }

    fn on_edge(&mut self, active: bool, now_ms: u64, out: &mut InputEvents) {
        self.gesture = match (self.gesture, active) {
            (Gesture::Idle, true) => Gesture::Pressed {
                since_ms: now_ms,
                second: false,
                long_fired: false,
            },
            (Gesture::WaitSecondPress { .. }, true) => Gesture::Pressed {
                since_ms: now_ms,
                second: true,
                long_fired: false,
            },
            (
                Gesture::Pressed {
                    since_ms,
                    second,
                    long_fired,
                },
                false,
            ) => {
                let held = now_ms.saturating_sub(since_ms);
                if long_fired || held >= self.timing.short_press_ms {
                    Gesture::Idle
                } else if second {
                    let _ = out.push(InputEvent::Double);
                    Gesture::Idle
                } else {
                    Gesture::WaitSecondPress { released_ms: now_ms }
                }
            }
            (g, _) => g,
        };
    }

    fn on_time(&mut self, now_ms: u64, out: &mut InputEvents) {
        match self.gesture {
            Gesture::Pressed {
                since_ms,
                second,
                long_fired: false,
            } if now_ms.saturating_sub(since_ms) >= self.timing.long_press_ms => {
                let _ = out.push(InputEvent::Long);
                self.gesture = Gesture::Pressed {
                    since_ms,
                    second,
                    long_fired: true,
                };
            }
            Gesture::WaitSecondPress { released_ms }
                if now_ms.saturating_sub(released_ms) > DOUBLE_PRESS_WINDOW_MS =>
            {
                let _ = out.push(InputEvent::Single);
                self.gesture = Gesture::Idle;
            }
            _ => {}
        }
    }
}

impl<P: HalInputPin> Input for InputPin<P> {
    fn id(&self) -> i32 {
        self.id
    }

    fn state(&self) -> bool {
        self.level
    }

    fn poll(&mut self, now_ms: u64) -> InputEvents {
        let mut out = InputEvents::new();
        let Some(active) = self.sample() else {
            return out;
        };

        if active != self.raw {
            self.raw = active;
            self.raw_since_ms = now_ms;
        }
        if self.raw != self.level && now_ms.saturating_sub(self.raw_since_ms) >= DEBOUNCE_MS {
            self.level = self.raw;
            let _ = out.push(InputEvent::Change);
            self.on_edge(self.level, now_ms, &mut out);
        }
        self.on_time(now_ms, &mut out);
        out
    }
}
