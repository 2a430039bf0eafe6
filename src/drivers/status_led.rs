//! Single-colour status LED with a software blink engine.
//!
//! The orchestration core programs a mode through [`LedPort`]; the main
//! loop calls [`StatusLed::tick`] each pass to advance the blink phase
//! and drive the pin.
//!
//! ## Modes
//!
//! | Mode     | Pin                                   |
//! |----------|---------------------------------------|
//! | Released | Inactive level, never touched again   |
//! | Level    | Steady lit / dark                     |
//! | Blink    | `on_ms` lit, `off_ms` dark, repeating |

use embedded_hal::digital::OutputPin as HalOutputPin;
use log::warn;

use crate::app::ports::LedPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Released,
    Level(bool),
    Blink { on_ms: u32, off_ms: u32 },
}

pub struct StatusLed<P> {
    pin: P,
    active_level: bool,
    mode: LedMode,
    /// Start of the current blink cycle; `None` until the first tick.
    phase_start_ms: Option<u64>,
    lit: Option<bool>,
}

impl<P: HalOutputPin> StatusLed<P> {
    pub fn new(pin: P, active_level: bool) -> Self {
        Self {
            pin,
            active_level,
            mode: LedMode::Released,
            phase_start_ms: None,
            lit: None,
        }
    }

    pub fn mode(&self) -> LedMode {
        self.mode
    }

    /// Whether the LED is currently emitting light.
    pub fn is_lit(&self) -> bool {
        self.lit.unwrap_or(false)
    }

    /// Advance the blink phase and drive the pin.
    pub fn tick(&mut self, now_ms: u64) {
        let lit = match self.mode {
            LedMode::Released => return,
            LedMode::Level(lit) => lit,
            LedMode::Blink { on_ms, off_ms } => {
                let start = *self.phase_start_ms.get_or_insert(now_ms);
                let period = u64::from(on_ms) + u64::from(off_ms);
                now_ms.saturating_sub(start) % period < u64::from(on_ms)
            }
        };
        self.drive(lit);
    }

    fn drive(&mut self, lit: bool) {
        if self.lit == Some(lit) {
            return;
        }
        let res = if lit == self.active_level {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match res {
            Ok(()) => self.lit = Some(lit),
            Err(_) => warn!("Status LED: GPIO write failed"),
        }
    }
}

impl<P: HalOutputPin> LedPort for StatusLed<P> {
    fn blink(&mut self, on_ms: u32, off_ms: u32) {
        self.phase_start_ms = None;
        self.mode = if on_ms == 0 && off_ms == 0 {
            LedMode::Level(false)
        } else {
            LedMode::Blink { on_ms, off_ms }
        };
    }

    fn set_level(&mut self, lit: bool) {
        self.mode = LedMode::Level(lit);
        self.drive(lit);
    }

    fn release(&mut self) {
        self.drive(false);
        self.mode = LedMode::Released;
    }
}
