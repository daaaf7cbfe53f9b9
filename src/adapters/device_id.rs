//! Device identity derived from the ESP32 factory MAC address.
//!
//! Used when the configuration leaves `sensor_id` or `mqtt_client_id`
//! unset.  Both are stable across reboots (factory-burned eFuse MAC):
//! - sensor id `mb-xxyyzz`, the `{id}` in `mailbox/{id}/...`
//! - MQTT client id `mailwatch-xxyyzz`

use core::fmt::Write;

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

/// `mb-xxyyzz` from the last 3 MAC bytes.
pub fn sensor_id(mac: &MacAddress) -> heapless::String<16> {
    let mut id = heapless::String::new();
    let _ = write!(id, "mb-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}

/// `mailwatch-xxyyzz` from the last 3 MAC bytes.
pub fn client_id(mac: &MacAddress) -> heapless::String<24> {
    let mut id = heapless::String::new();
    let _ = write!(id, "mailwatch-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}
