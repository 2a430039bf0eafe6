//! Physical button gestures.
//!
//! ```text
//!   Change ─────────▶ refresh indicator (held state tracked)
//!   Single ─────────▶ cycle switch states (binary counter)
//!   Long   ─────────▶ reset sequence: fast blink + 600 ms one-shot
//!   reset timer ────▶ network back to AP mode, persist, apply
//! ```
//!
//! The reset sequence has no cancel path once started.

use log::info;

use crate::peripherals::InputEvent;

/// Delay between long-press detection and the network reset.
pub const RESET_DELAY_MS: u32 = 600;

/// Identify blinks shown once the reset has been applied.
pub const RESET_IDENTIFY_COUNT: u8 = 2;

/// Diagnostic tag for switch changes made from the button.
pub const SOURCE_BUTTON: &str = "btn";

/// What the service must do in response to a button event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    RefreshIndicator,
    CycleSwitches,
    /// Start the reset blink and schedule the deferred reset.
    BeginReset,
}

#[derive(Debug, Default)]
pub struct ButtonGestureHandler {
    held: bool,
    reset_pending: bool,
}

impl ButtonGestureHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The button is currently held down.
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn is_reset_pending(&self) -> bool {
        self.reset_pending
    }

    pub fn on_event(&mut self, event: InputEvent, pressed: bool) -> Option<ButtonAction> {
        self.held = pressed;
        match event {
            InputEvent::Change => Some(ButtonAction::RefreshIndicator),
            InputEvent::Single => Some(ButtonAction::CycleSwitches),
            InputEvent::Long => {
                if self.reset_pending {
                    return None;
                }
                info!("Button: long press, starting reset sequence");
                self.reset_pending = true;
                Some(ButtonAction::BeginReset)
            }
            InputEvent::Double => None,
        }
    }

    /// The deferred reset fired.  Returns `true` if a reset was pending.
    pub fn confirm_reset(&mut self) -> bool {
        core::mem::take(&mut self.reset_pending)
    }
}

/// Treat `states` as a little-endian binary number (index 0 = bit 0),
/// add one and wrap at `2^len`.
pub fn next_switch_states(states: &[bool]) -> Vec<bool> {
    let mut next = states.to_vec();
    for bit in &mut next {
        *bit = !*bit;
        if *bit {
            break;
        }
    }
    next
}
