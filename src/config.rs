//! Device configuration record.
//!
//! Everything the orchestration core reads from persistent configuration:
//! identity, per-switch settings, thermal thresholds, button/LED wiring
//! and network mode.  Persisted by a [`ConfigPort`](crate::app::ports::ConfigPort)
//! implementation (postcard blob in NVS on the device).

use serde::{Deserialize, Serialize};

/// Maximum number of switch channels on any supported board.
pub const MAX_SWITCHES: usize = 4;

/// User-visible names, host names and device ids.
pub type Name = heapless::String<64>;

/// Factory template for the stable device identifier.  Each `?` is replaced
/// with a hex digit of the factory MAC address.
pub const DEVICE_ID_TEMPLATE: &str = "smartrelay-??????";

/// Input mode value that detaches the input from its switch and exposes it
/// as a stateless (programmable) switch instead.
pub const IN_MODE_DETACHED: u8 = 3;

/// How a switch reacts to its own input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum InMode {
    /// Toggle on every single press.
    Momentary = 0,
    /// Output follows the input level.
    Toggle = 1,
    /// Toggle on every input edge.
    Edge = 2,
    /// Input drives a stateless switch; the output is not touched.
    Detached = IN_MODE_DETACHED,
}

/// Output state applied when the switch is first built after boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum InitialState {
    Off = 0,
    On = 1,
    /// Restore the last persisted state.
    Last = 2,
    /// Follow the input level (falls back to off without an input).
    Input = 3,
}

/// Per-switch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Peripheral id shared by the switch's input, output and power meter.
    pub id: i32,
    pub name: Name,
    /// 0 = switch, 1 = outlet, 2 = lock, anything else = not exposed.
    pub svc_type: i32,
    pub in_mode: InMode,
    pub initial_state: InitialState,
    /// Pre-v1 flag, superseded by `initial_state == Last`.
    pub persist_state: bool,
    /// Last known output state, used by `InitialState::Last`.
    pub state: bool,
}

/// Settings of the stateless switch built for a detached input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatelessSwitchConfig {
    pub id: i32,
    pub name: Name,
}

/// Physical button wiring and gesture thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// GPIO number, `-1` when the board has no button.
    pub gpio: i32,
    /// Level read while the button is held down.
    pub on_value: bool,
    /// Releases shorter than this count as a single press (milliseconds).
    pub short_press_ms: u32,
    /// Holding at least this long is a long press (milliseconds).
    pub long_press_ms: u32,
}

/// Status LED wiring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedConfig {
    /// GPIO number, `-1` when the board has no status LED.
    pub gpio: i32,
    /// Level that lights the LED.
    pub active_level: bool,
}

/// Network mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Station mode: join the configured network.
    pub sta_enable: bool,
    /// Access-point mode: local provisioning network.
    pub ap_enable: bool,
    pub ssid: heapless::String<32>,
    /// Empty for an open network.
    pub password: heapless::String<64>,
}

/// Complete device configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Migration gate, see [`crate::migrate`].
    pub cfg_version: u32,
    /// Stable device identifier (expanded from [`DEVICE_ID_TEMPLATE`]).
    pub device_id: Name,
    /// User-visible name of the primary accessory.
    pub name: Name,
    /// Discovery host name.
    pub host_name: Name,
    /// Flatten switch services into the primary accessory.
    pub legacy_hap_layout: bool,

    // --- Thermal protection ---
    /// Trip the overheat interlock at or above this temperature (Celsius).
    pub overheat_on_c: i32,
    /// Release the interlock at or below this temperature (Celsius).
    pub overheat_off_c: i32,

    // --- Timing ---
    /// Housekeeping tick period (milliseconds).
    pub housekeeping_interval_ms: u32,

    pub button: ButtonConfig,
    pub status_led: LedConfig,
    pub switches: heapless::Vec<SwitchConfig, MAX_SWITCHES>,
    pub stateless_switches: heapless::Vec<StatelessSwitchConfig, MAX_SWITCHES>,
    pub network: NetworkConfig,
}

impl DeviceConfig {
    /// Settings of switch `id`, if configured.
    pub fn switch(&self, id: i32) -> Option<&SwitchConfig> {
        self.switches.iter().find(|s| s.id == id)
    }

    /// Mutable settings of switch `id`, if configured.
    pub fn switch_mut(&mut self, id: i32) -> Option<&mut SwitchConfig> {
        self.switches.iter_mut().find(|s| s.id == id)
    }

    /// Stateless-switch settings for input `id`, if configured.
    pub fn stateless_switch(&self, id: i32) -> Option<&StatelessSwitchConfig> {
        self.stateless_switches.iter().find(|s| s.id == id)
    }

    /// True if any switch uses its input as a detached stateless button.
    pub fn has_detached_inputs(&self) -> bool {
        self.switches.iter().any(|s| s.in_mode == InMode::Detached)
    }
}

/// Build a [`Name`], truncating at capacity.
pub fn name(s: &str) -> Name {
    let mut n = Name::new();
    for c in s.chars() {
        if n.push(c).is_err() {
            break;
        }
    }
    n
}

impl SwitchConfig {
    /// A plain switch channel with factory defaults.
    pub fn new(id: i32, svc_type: i32) -> Self {
        let mut label = heapless::String::<16>::new();
        let _ = core::fmt::Write::write_fmt(&mut label, format_args!("Switch {}", id + 1));
        Self {
            id,
            name: name(&label),
            svc_type,
            in_mode: InMode::Momentary,
            initial_state: InitialState::Off,
            persist_state: false,
            state: false,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let mut switches = heapless::Vec::new();
        let _ = switches.push(SwitchConfig::new(0, 0));
        Self {
            cfg_version: crate::migrate::CURRENT_CONFIG_VERSION,
            device_id: name(DEVICE_ID_TEMPLATE),
            name: name(DEVICE_ID_TEMPLATE),
            host_name: name(DEVICE_ID_TEMPLATE),
            legacy_hap_layout: false,

            // Thermal protection
            overheat_on_c: 90,
            overheat_off_c: 75,

            // Timing
            housekeeping_interval_ms: 1000,

            button: ButtonConfig {
                gpio: 0,
                on_value: false,
                short_press_ms: 500,
                long_press_ms: 10_000,
            },
            status_led: LedConfig {
                gpio: 2,
                active_level: false,
            },
            switches,
            stateless_switches: heapless::Vec::new(),
            network: NetworkConfig {
                sta_enable: false,
                ap_enable: true,
                ssid: heapless::String::new(),
                password: heapless::String::new(),
            },
        }
    }
}
