//! Version-gated configuration migration.
//!
//! Runs once at boot, before peripherals are created.  Each step moves
//! `cfg_version` forward by one and is persisted immediately, so a power
//! loss between steps resumes from the last persisted version.
//!
//! | from | to | transform |
//! |------|----|-----------|
//! | 0    | 1  | `persist_state` → `initial_state = Last` |
//! | 1    | 2  | paired two-switch device, no detached inputs → legacy layout on |
//! | 2    | 3  | name and host name ← device id; device id ← template |

use log::{info, warn};

use crate::adapters::device_id::{MacAddress, expand_mac_placeholders};
use crate::app::ports::ConfigPort;
use crate::config::{DEVICE_ID_TEMPLATE, DeviceConfig, InitialState};

/// Version written by the newest migration step.
pub const CURRENT_CONFIG_VERSION: u32 = 3;

/// Facts about the device the steps depend on.
#[derive(Debug, Clone, Copy)]
pub struct MigrationEnv {
    /// A controller is already paired with the accessory server.
    pub paired: bool,
    pub mac: MacAddress,
}

/// Apply the next pending step.  Returns `false` if already current.
pub fn migrate_step(config: &mut DeviceConfig, env: &MigrationEnv) -> bool {
    match config.cfg_version {
        0 => {
            for sw in config.switches.iter_mut().filter(|s| s.persist_state) {
                sw.initial_state = InitialState::Last;
            }
        }
        1 => {
            // Keep the topology existing pairings were made against.
            // Only dual-switch devices ever shipped the single-accessory layout.
            if env.paired && config.switches.len() >= 2 && !config.has_detached_inputs() {
                config.legacy_hap_layout = true;
            }
        }
        2 => {
            config.name = config.device_id.clone();
            config.host_name = config.device_id.clone();
            config.device_id = expand_mac_placeholders(DEVICE_ID_TEMPLATE, &env.mac);
        }
        _ => return false,
    }
    config.cfg_version += 1;
    info!("Config migrated to v{}", config.cfg_version);
    true
}

/// Run every pending step, saving after each.  Returns `true` if anything changed.
pub fn migrate(config: &mut DeviceConfig, env: &MigrationEnv, port: &dyn ConfigPort) -> bool {
    let mut changed = false;
    while migrate_step(config, env) {
        changed = true;
        if let Err(e) = port.save(config) {
            warn!("Config save after migration to v{} failed: {}", config.cfg_version, e);
        }
    }
    changed
}
