//! Accessory-server lifecycle.
//!
//! ```text
//!            start_service (flags == 0, provisioned)
//!   ┌──────┐ ─────────────────────────────────────▶ ┌─────────┐
//!   │ Idle │                                         │ Running │
//!   └──────┘ ◀───── server reports Idle ──────────── └─────────┘
//!      ▲              (catalog cleared here)              │
//!      │                                                  │ stop_service
//!      └──────────────────── Stopping ◀───────────────────┘
//! ```
//!
//! The catalog is built lazily on the first start attempt and torn down
//! only when the server reports Idle, because live sessions may still
//! reference accessories until then.

use log::{error, info, warn};

use crate::catalog::{AccessoryBuilder, Catalog};
use crate::config::DeviceConfig;
use crate::peripherals::PeripheralRegistry;

use super::events::AppEvent;
use super::ports::{AccessoryServerPort, ConfigPort, EventSink, ServerState};

// ───────────────────────────────────────────────────────────────
// Service flags
// ───────────────────────────────────────────────────────────────

/// Conditions that inhibit starting the accessory server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceFlag {
    Overheat = 0b0000_0001,
    FirmwareUpdate = 0b0000_0010,
    RebootPending = 0b0000_0100,
}

impl ServiceFlag {
    pub fn mask(self) -> u8 {
        self as u8
    }
}

impl core::fmt::Display for ServiceFlag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Overheat => write!(f, "overheat"),
            Self::FirmwareUpdate => write!(f, "firmware update"),
            Self::RebootPending => write!(f, "reboot pending"),
        }
    }
}

/// Bitset over [`ServiceFlag`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceFlags(u8);

impl ServiceFlags {
    pub fn set(&mut self, flag: ServiceFlag) {
        if self.0 & flag.mask() == 0 {
            info!("Service flag set: {flag}");
        }
        self.0 |= flag.mask();
    }

    pub fn clear(&mut self, flag: ServiceFlag) {
        if self.0 & flag.mask() != 0 {
            info!("Service flag cleared: {flag}");
        }
        self.0 &= !flag.mask();
    }

    pub fn contains(self, flag: ServiceFlag) -> bool {
        self.0 & flag.mask() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

// ───────────────────────────────────────────────────────────────
// Lifecycle
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ServiceLifecycle {
    catalog: Catalog,
    flags: ServiceFlags,
    /// Set once the first catalog of this boot has been built.
    built_once: bool,
}

impl ServiceLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn flags(&self) -> ServiceFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut ServiceFlags {
        &mut self.flags
    }

    /// Build (if needed) and start the accessory server.
    ///
    /// Returns `false` without side effects while any service flag is set,
    /// and `false` after building while provisioning is missing.  Returns
    /// `true` if the server is already past Idle or was started now.
    pub fn start_service(
        &mut self,
        quiet: bool,
        server: &mut dyn AccessoryServerPort,
        registry: &mut PeripheralRegistry,
        config: &DeviceConfig,
        sink: &mut dyn EventSink,
    ) -> bool {
        if !self.flags.is_empty() {
            return false;
        }
        if server.state() != ServerState::Idle {
            return true;
        }
        if self.catalog.is_empty() {
            let first = !self.built_once;
            self.catalog = AccessoryBuilder::new(registry, first).build(config);
            self.built_once = true;
        }

        if !server.is_provisioned() {
            if !quiet {
                info!("=== Accessory not provisioned");
            }
            return false;
        }

        let cn = server.configuration_number().unwrap_or(0);
        let Some(primary) = self.catalog.primary() else {
            return false;
        };
        let bridged = self.catalog.bridged();
        let bridge = !bridged.is_empty();
        if bridge {
            info!(
                "=== Starting HAP bridge (CN {}, {} accessories)",
                cn,
                bridged.len()
            );
            server.start_bridge(primary, bridged);
        } else {
            info!("=== Starting HAP server (CN {})", cn);
            server.start(primary);
        }
        sink.emit(&AppEvent::ServiceStarted {
            bridge,
            accessories: self.catalog.accessories().len(),
            cn,
        });
        true
    }

    /// Request a stop.  The catalog survives until the server reports Idle.
    pub fn stop_service(&mut self, server: &mut dyn AccessoryServerPort, sink: &mut dyn EventSink) {
        if server.state() == ServerState::Idle {
            return;
        }
        info!("== Stopping HAP service");
        server.stop();
        sink.emit(&AppEvent::ServiceStopping);
    }

    /// Stop, bump the configuration number and drop the legacy layout.
    /// The next housekeeping tick starts the server again.
    pub fn restart_service(
        &mut self,
        server: &mut dyn AccessoryServerPort,
        config: &mut DeviceConfig,
        config_port: &dyn ConfigPort,
        sink: &mut dyn EventSink,
    ) {
        self.stop_service(server, sink);
        if let Err(e) = server.increment_configuration_number() {
            error!("Failed to increment configuration number: {e}");
        }
        disable_legacy_layout(config, config_port);
    }

    /// Server state notification.  Returns `true` if the catalog was torn down.
    pub fn on_server_state(&mut self, state: ServerState, sink: &mut dyn EventSink) -> bool {
        info!("HAP server state: {:?}", state);
        if state != ServerState::Idle {
            return false;
        }
        if self.catalog.is_empty() {
            return false;
        }
        self.catalog.clear();
        sink.emit(&AppEvent::CatalogCleared);
        true
    }
}

/// Turn off the legacy single-accessory layout and persist.
/// Returns `true` if it was on.
pub fn disable_legacy_layout(config: &mut DeviceConfig, config_port: &dyn ConfigPort) -> bool {
    if !config.legacy_hap_layout {
        return false;
    }
    info!("Turning off legacy HAP layout");
    config.legacy_hap_layout = false;
    if let Err(e) = config_port.save(config) {
        warn!("Config save failed: {e}");
    }
    true
}
