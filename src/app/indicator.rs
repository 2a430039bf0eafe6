//! Status LED arbitration.
//!
//! The device condition is resolved to one [`BlinkPattern`] through an
//! ordered rule table; the first matching rule wins.
//!
//! | # | Condition                              | on / off (ms) |
//! |---|----------------------------------------|---------------|
//! | 1 | identify pending                        | 100 / 100     |
//! | 2 | button held                             | solid         |
//! | 3 | link connecting                         | 200 / 200     |
//! | 4 | firmware update in progress             | 250 / 250     |
//! | 5 | server not running                      | 25 / 875      |
//! | 6 | running, AP provisioning enabled        | 875 / 25      |
//! | 7 | running, not paired                     | 500 / 500     |
//! | 8 | otherwise                               | off           |
//!
//! Hardware is re-programmed only when the resolved pattern changes, so an
//! in-progress blink never glitches.

use log::debug;

use super::ports::{LedPort, LinkState, ServerState};

/// LED timing.  `on_ms == 1, off_ms == 0` is the solid-on sentinel and
/// `on_ms == 0` means dark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub on_ms: u32,
    pub off_ms: u32,
}

impl BlinkPattern {
    pub const fn new(on_ms: u32, off_ms: u32) -> Self {
        Self { on_ms, off_ms }
    }

    pub const IDENTIFY: Self = Self::new(100, 100);
    pub const SOLID: Self = Self::new(1, 0);
    pub const LINK: Self = Self::new(200, 200);
    pub const UPDATE: Self = Self::new(250, 250);
    pub const AWAITING_PROVISIONING: Self = Self::new(25, 875);
    pub const AP_PROVISIONING: Self = Self::new(875, 25);
    pub const PAIRING: Self = Self::new(500, 500);
    pub const OFF: Self = Self::new(0, 0);

    pub fn is_solid(self) -> bool {
        self == Self::SOLID
    }

    pub fn is_off(self) -> bool {
        self.on_ms == 0
    }
}

/// Snapshot of everything the rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorInputs {
    pub identify_pending: bool,
    pub button_held: bool,
    pub link: LinkState,
    pub update_in_progress: bool,
    pub server: ServerState,
    pub ap_enabled: bool,
    pub paired: bool,
}

type Rule = (&'static str, fn(&IndicatorInputs) -> bool, BlinkPattern);

fn identify_pending(i: &IndicatorInputs) -> bool {
    i.identify_pending
}

fn button_held(i: &IndicatorInputs) -> bool {
    i.button_held
}

fn link_connecting(i: &IndicatorInputs) -> bool {
    matches!(i.link, LinkState::Connecting | LinkState::Connected)
}

fn update_in_progress(i: &IndicatorInputs) -> bool {
    i.update_in_progress
}

fn server_not_running(i: &IndicatorInputs) -> bool {
    i.server != ServerState::Running
}

fn ap_enabled(i: &IndicatorInputs) -> bool {
    i.ap_enabled
}

fn not_paired(i: &IndicatorInputs) -> bool {
    !i.paired
}

static RULES: [Rule; 7] = [
    ("identify", identify_pending, BlinkPattern::IDENTIFY),
    ("btn", button_held, BlinkPattern::SOLID),
    ("WiFi", link_connecting, BlinkPattern::LINK),
    ("update", update_in_progress, BlinkPattern::UPDATE),
    ("HAP provisioning", server_not_running, BlinkPattern::AWAITING_PROVISIONING),
    ("WiFi provisioning", ap_enabled, BlinkPattern::AP_PROVISIONING),
    ("pairing", not_paired, BlinkPattern::PAIRING),
];

/// First matching rule's pattern, [`BlinkPattern::OFF`] if none match.
pub fn resolve(inputs: &IndicatorInputs) -> BlinkPattern {
    RULES
        .iter()
        .find(|(_, pred, _)| pred(inputs))
        .map_or(BlinkPattern::OFF, |&(name, _, pattern)| {
            debug!("LED: {name}");
            pattern
        })
}

/// Owns the identify countdown and the last applied pattern.
#[derive(Debug, Default)]
pub struct StatusIndicator {
    identify_count: u8,
    applied: Option<BlinkPattern>,
}

impl StatusIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `count` identify evaluations.
    pub fn identify(&mut self, count: u8) {
        self.identify_count = count;
    }

    pub fn identify_count(&self) -> u8 {
        self.identify_count
    }

    /// Pattern currently programmed into the LED.
    pub fn applied(&self) -> Option<BlinkPattern> {
        self.applied
    }

    /// Forget the applied pattern so the next evaluation re-programs the LED.
    pub fn invalidate(&mut self) {
        self.applied = None;
    }

    /// Resolve and apply.  `inputs.identify_pending` is overridden by the
    /// internal counter, which is decremented on each identify evaluation.
    pub fn evaluate(&mut self, mut inputs: IndicatorInputs, led: &mut dyn LedPort) -> BlinkPattern {
        inputs.identify_pending = self.identify_count > 0;
        if inputs.identify_pending {
            self.identify_count -= 1;
        }
        let pattern = resolve(&inputs);
        self.apply(pattern, led);
        pattern
    }

    fn apply(&mut self, pattern: BlinkPattern, led: &mut dyn LedPort) {
        if pattern.is_off() {
            if self.applied != Some(pattern) {
                led.release();
            }
        } else if pattern.is_solid() {
            // Solid level is always re-asserted.
            led.blink(0, 0);
            led.set_level(true);
        } else if self.applied != Some(pattern) {
            led.blink(pattern.on_ms, pattern.off_ms);
        }
        self.applied = Some(pattern);
    }
}
