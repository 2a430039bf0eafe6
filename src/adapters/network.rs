//! WiFi adapter for station / access-point mode.
//!
//! Implements [`NetworkPort`].  The orchestration core only applies mode
//! changes (the long-press reset falls back to AP provisioning) and reads
//! the station link state for the status LED.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi`.
//! - **all other targets**: simulated link state for host-side tests.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{LinkState, NetworkPort};
use crate::config::{Name, NetworkConfig};
use crate::error::NetworkError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
};

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Station settings are only checked when station mode is on.
pub fn validate_network(config: &NetworkConfig) -> Result<(), NetworkError> {
    if !config.sta_enable {
        return Ok(());
    }
    if config.ssid.is_empty() || !is_printable_ascii(&config.ssid) {
        return Err(NetworkError::InvalidSsid);
    }
    let pw = config.password.len();
    if pw != 0 && !(8..=64).contains(&pw) {
        return Err(NetworkError::ApplyFailed);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    /// SSID of the provisioning access point.
    ap_ssid: Name,
    sta_enabled: bool,
    ap_enabled: bool,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim_link: LinkState,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: EspWifi<'static>, ap_ssid: Name) -> Self {
        Self {
            ap_ssid,
            sta_enabled: false,
            ap_enabled: false,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(ap_ssid: Name) -> Self {
        Self {
            ap_ssid,
            sta_enabled: false,
            ap_enabled: false,
            sim_link: LinkState::Disconnected,
        }
    }

    pub fn is_ap_enabled(&self) -> bool {
        self.ap_enabled
    }

    /// Simulation: drive the station link state.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_link(&mut self, link: LinkState) {
        self.sim_link = link;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_apply(&mut self, config: &NetworkConfig) -> Result<(), NetworkError> {
        let client = || -> Result<ClientConfiguration, NetworkError> {
            Ok(ClientConfiguration {
                ssid: config
                    .ssid
                    .as_str()
                    .try_into()
                    .map_err(|_| NetworkError::InvalidSsid)?,
                password: config
                    .password
                    .as_str()
                    .try_into()
                    .map_err(|_| NetworkError::ApplyFailed)?,
                auth_method: if config.password.is_empty() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            })
        };
        let ap = || -> Result<AccessPointConfiguration, NetworkError> {
            let ssid: &str = self.ap_ssid.as_str();
            Ok(AccessPointConfiguration {
                ssid: ssid.get(..32).unwrap_or(ssid).try_into().map_err(|_| NetworkError::InvalidSsid)?,
                auth_method: AuthMethod::None,
                ..Default::default()
            })
        };
        let wifi_cfg = match (config.sta_enable, config.ap_enable) {
            (true, true) => Configuration::Mixed(client()?, ap()?),
            (true, false) => Configuration::Client(client()?),
            (false, true) => Configuration::AccessPoint(ap()?),
            (false, false) => Configuration::None,
        };

        self.wifi
            .set_configuration(&wifi_cfg)
            .map_err(|_| NetworkError::ApplyFailed)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| NetworkError::ApplyFailed)?;
        }
        if config.sta_enable {
            if let Err(e) = self.wifi.connect() {
                // The driver keeps retrying in the background.
                warn!("WiFi: connect failed: {e}");
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_apply(&mut self, config: &NetworkConfig) -> Result<(), NetworkError> {
        self.sim_link = if config.sta_enable {
            LinkState::Connecting
        } else {
            LinkState::Disconnected
        };
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_link_state(&self) -> LinkState {
        match self.wifi.is_connected() {
            Ok(true) => {
                let has_ip = self
                    .wifi
                    .sta_netif()
                    .get_ip_info()
                    .is_ok_and(|info| !info.ip.is_unspecified());
                if has_ip {
                    LinkState::IpAcquired
                } else {
                    LinkState::Connected
                }
            }
            _ => LinkState::Connecting,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_link_state(&self) -> LinkState {
        self.sim_link
    }
}

impl NetworkPort for WifiAdapter {
    fn link_state(&self) -> LinkState {
        if !self.sta_enabled {
            return LinkState::Disconnected;
        }
        self.platform_link_state()
    }

    fn apply(&mut self, config: &NetworkConfig) -> Result<(), NetworkError> {
        validate_network(config)?;
        self.platform_apply(config)?;
        self.sta_enabled = config.sta_enable;
        self.ap_enabled = config.ap_enable;
        info!(
            "WiFi: sta={} ap={} ('{}')",
            config.sta_enable, config.ap_enable, self.ap_ssid
        );
        Ok(())
    }
}
