//! Device identity derived from the ESP32 factory MAC address.
//!
//! Identity templates carry `?` placeholders (e.g. `smartrelay-??????`).
//! Expansion fills them right-to-left with the uppercase hex digits of the
//! MAC, so the last placeholder receives the MAC's last nibble.  The result
//! is stable across reboots (factory-burned eFuse MAC).

use crate::config::Name;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Replace each `?` in `template` with a MAC hex digit, right-aligned.
/// Placeholders beyond the 12 available digits are left as `?`.
pub fn expand_mac_placeholders(template: &str, mac: &MacAddress) -> Name {
    let mut digits = mac
        .iter()
        .rev()
        .flat_map(|b| [HEX[(b & 0x0F) as usize], HEX[(b >> 4) as usize]]);

    let mut rev: heapless::Vec<char, 64> = heapless::Vec::new();
    for c in template.chars().rev() {
        let out = if c == '?' {
            digits.next().map_or('?', char::from)
        } else {
            c
        };
        if rev.push(out).is_err() {
            break;
        }
    }
    let mut name = Name::new();
    for c in rev.iter().rev() {
        let _ = name.push(*c);
    }
    name
}
