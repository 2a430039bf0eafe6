//! GPIO / peripheral assignments for the relay board.
//!
//! Single source of truth for the switch channels.  The button and the
//! status LED are configurable (see [`ButtonConfig`](crate::config::ButtonConfig)
//! and [`LedConfig`](crate::config::LedConfig)); everything else is fixed by
//! the board.

use crate::config::MAX_SWITCHES;

// ---------------------------------------------------------------------------
// Switch channels
// ---------------------------------------------------------------------------

/// Wiring of one switch channel.  Index in [`CHANNELS`] is the peripheral id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// Relay coil driver.
    pub relay_gpio: i32,
    /// Level that energises the relay.
    pub relay_active_level: bool,
    /// Wall-switch terminal, `-1` if the channel has none.
    pub input_gpio: i32,
    /// Level read while the terminal is closed.
    pub input_active_level: bool,
}

pub const CHANNELS: [Channel; 2] = [
    Channel {
        relay_gpio: 4,
        relay_active_level: true,
        input_gpio: 5,
        input_active_level: true,
    },
    Channel {
        relay_gpio: 15,
        relay_active_level: true,
        input_gpio: 13,
        input_active_level: true,
    },
];

const _: () = assert!(CHANNELS.len() <= MAX_SWITCHES);

// ---------------------------------------------------------------------------
// Sensors: analog (ADC1)
// ---------------------------------------------------------------------------

/// NTC thermistor next to the relays, 10 kOhm @ 25 C.
/// ADC1 channel 0 (GPIO 36 on ESP32).
pub const SYS_TEMP_ADC_CHANNEL: u32 = 0;

/// Wiring of channel `id`, if the board has it.
pub fn channel(id: i32) -> Option<&'static Channel> {
    usize::try_from(id).ok().and_then(|i| CHANNELS.get(i))
}
