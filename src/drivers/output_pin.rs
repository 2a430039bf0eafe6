//! Relay output on a GPIO pin.
//!
//! `active_level` is the electrical level that energises the relay, so
//! `state()` always reads in relay terms regardless of board wiring.

use embedded_hal::digital::OutputPin as HalOutputPin;
use log::{info, warn};

use crate::error::PeripheralError;
use crate::peripherals::Output;

pub struct OutputPin<P> {
    id: i32,
    pin: P,
    active_level: bool,
    on: bool,
}

impl<P: HalOutputPin> OutputPin<P> {
    /// Takes ownership of the pin and drives it to the off level.
    pub fn new(id: i32, pin: P, active_level: bool) -> Result<Self, PeripheralError> {
        let mut out = Self {
            id,
            pin,
            active_level,
            on: false,
        };
        out.drive(false)?;
        Ok(out)
    }

    fn drive(&mut self, on: bool) -> Result<(), PeripheralError> {
        let high = on == self.active_level;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|_| PeripheralError::GpioWriteFailed)
    }
}

impl<P: HalOutputPin> Output for OutputPin<P> {
    fn id(&self) -> i32 {
        self.id
    }

    fn state(&self) -> bool {
        self.on
    }

    fn set_state(&mut self, on: bool, source: &str) -> Result<(), PeripheralError> {
        if let Err(e) = self.drive(on) {
            warn!("Output {}: {} ({})", self.id, e, source);
            return Err(e);
        }
        if self.on != on {
            info!("Output {}: {} -> {} ({})", self.id, self.on, on, source);
        }
        self.on = on;
        Ok(())
    }
}
