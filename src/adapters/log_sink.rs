//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { cfg_version } => {
                info!("START | cfg_version={}", cfg_version);
            }
            AppEvent::ServiceStarted {
                bridge,
                accessories,
                cn,
            } => {
                info!(
                    "HAP | started mode={} accessories={} cn={}",
                    if *bridge { "bridge" } else { "single" },
                    accessories,
                    cn
                );
            }
            AppEvent::ServiceStopping => info!("HAP | stopping"),
            AppEvent::CatalogCleared => info!("HAP | idle, catalog cleared"),
            AppEvent::OverheatTripped(t) => {
                error!("OVH | tripped at {}\u{00b0}C, outputs off", t);
            }
            AppEvent::OverheatCleared(t) => info!("OVH | cleared at {}\u{00b0}C", t),
            AppEvent::SwitchChanged { id, state, source } => {
                info!("SW{} | {} ({})", id, if *state { "on" } else { "off" }, source);
            }
            AppEvent::ProgrammableSwitch { id, press } => {
                info!("SSW{} | {:?}", id, press);
            }
            AppEvent::NetworkReset => warn!("NET | reset to AP provisioning"),
            AppEvent::UpdateRejected => warn!("OTA | rejected"),
            AppEvent::Status(report) => info!("STATUS | {}", report),
        }
    }
}
