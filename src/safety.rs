//! Thermal interlock.
//!
//! The guard runs every housekeeping tick with the latest system
//! temperature.  It latches an "overheated" state with hysteresis:
//!
//! 1. Unlatched and reading ≥ `on_c` → latch, report [`ThermalAction::Trip`].
//! 2. Latched → further high readings are ignored.
//! 3. Latched and reading ≤ `off_c` → unlatch, report [`ThermalAction::Recover`].
//!
//! A missing reading skips evaluation entirely; it is neither "safe" nor
//! "hot".  The caller owns the consequences (service flag, stopping the
//! server, forcing outputs off).

use log::{error, info};

use crate::config::DeviceConfig;

/// Diagnostic tag attached to outputs forced off by the interlock.
pub const SOURCE_OVERHEAT: &str = "OVH";

/// Edge reported by [`ThermalGuard::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalAction {
    /// Crossed the trip threshold; stop service and force outputs off.
    Trip,
    /// Cooled below the release threshold.
    Recover,
}

#[derive(Debug, Clone)]
pub struct ThermalGuard {
    on_c: i32,
    off_c: i32,
    overheated: bool,
}

impl ThermalGuard {
    pub fn new(config: &DeviceConfig) -> Self {
        Self::with_thresholds(config.overheat_on_c, config.overheat_off_c)
    }

    pub fn with_thresholds(on_c: i32, off_c: i32) -> Self {
        debug_assert!(on_c > off_c, "thermal thresholds inverted");
        Self {
            on_c,
            off_c,
            overheated: false,
        }
    }

    /// Evaluate one reading.  Returns the edge, if any.
    pub fn evaluate(&mut self, reading_c: Option<i32>) -> Option<ThermalAction> {
        let t = reading_c?;
        if !self.overheated {
            if t >= self.on_c {
                error!("== System temperature too high ({t}C), stopping service");
                self.overheated = true;
                return Some(ThermalAction::Trip);
            }
        } else if t <= self.off_c {
            info!("== System temperature normal ({t}C), resuming service");
            self.overheated = false;
            return Some(ThermalAction::Recover);
        }
        None
    }

    pub fn is_overheated(&self) -> bool {
        self.overheated
    }

    pub fn thresholds(&self) -> (i32, i32) {
        (self.on_c, self.off_c)
    }
}
