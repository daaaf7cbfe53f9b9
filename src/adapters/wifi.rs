//! WiFi station-mode adapter.
//!
//! Brings the station interface up once at boot, retrying with the
//! fixed backoff from [`control::backoff`](crate::control::backoff).  After
//! that the ESP-IDF driver handles link loss on its own; the MQTT client
//! rides on top and the control loop only ever sees MQTT connectivity.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

use core::fmt;
use log::{info, warn};

use crate::app::ports::DelayPort;
use crate::control::backoff::{retry, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for WifiError {}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

/// Validated station credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"***")
            .finish()
    }
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, WifiError> {
        if ssid.is_empty() {
            return Err(WifiError::NoCredentials);
        }
        if ssid.len() > 32 || !ssid.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
            return Err(WifiError::InvalidSsid);
        }
        if !password.is_empty() && (password.len() < 8 || password.len() > 64) {
            return Err(WifiError::InvalidPassword);
        }

        let mut c = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        c.ssid.push_str(ssid).map_err(|_| WifiError::InvalidSsid)?;
        c.password
            .push_str(password)
            .map_err(|_| WifiError::InvalidPassword)?;
        Ok(c)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    credentials: WifiCredentials,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    /// Simulation: attempts that fail before the first success.
    #[cfg(not(target_os = "espidf"))]
    sim_failures_left: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_connected: bool,
}

impl WifiAdapter {
    /// Create the driver and apply the station configuration.
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: esp_idf_hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
        credentials: WifiCredentials,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

        let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        let auth_method = if credentials.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };

        // Lengths were checked by WifiCredentials::new.
        let mut client = ClientConfiguration {
            auth_method,
            ..Default::default()
        };
        let _ = client.ssid.push_str(&credentials.ssid);
        let _ = client.password.push_str(&credentials.password);

        wifi.set_configuration(&Configuration::Client(client))?;
        wifi.start()?;
        info!("WiFi: started, station '{}'", credentials.ssid());

        Ok(Self { credentials, wifi })
    }

    /// Simulated station that fails `failures` times before connecting.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulated(credentials: WifiCredentials, failures: u32) -> Self {
        Self {
            credentials,
            sim_failures_left: failures,
            sim_connected: false,
        }
    }

    /// Associate and wait for an IP, retrying per `policy`.
    pub fn connect(
        &mut self,
        policy: &RetryPolicy,
        delay: &mut impl DelayPort,
    ) -> Result<(), WifiError> {
        info!("WiFi: connecting to '{}'", self.credentials.ssid());
        retry("WiFi connect", policy, delay, |_| self.try_connect())?;
        info!("WiFi: connected");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn try_connect(&mut self) -> Result<(), WifiError> {
        let result = self
            .wifi
            .connect()
            .and_then(|()| self.wifi.wait_netif_up());
        if let Err(e) = result {
            warn!("WiFi: {}", e);
            let _ = self.wifi.disconnect();
            return Err(WifiError::ConnectionFailed);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn try_connect(&mut self) -> Result<(), WifiError> {
        if self.sim_failures_left > 0 {
            self.sim_failures_left -= 1;
            warn!("WiFi(sim): simulated association failure");
            return Err(WifiError::ConnectionFailed);
        }
        self.sim_connected = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_connected(&self) -> bool {
        self.sim_connected
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
