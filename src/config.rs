//! Device configuration parameters
//!
//! All tunable parameters for the Mailwatch device.  Values come from
//! [`DeviceConfig::default()`] or from a JSON document baked in at build
//! time (see `main.rs`).  Nothing here is persisted at runtime.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::topics::validate_sensor_id;

/// Alarm state the device enters at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootState {
    /// Wait for an explicit `arm_alarm` before evaluating anything.
    #[default]
    Disarmed,
    /// Arm at boot with the default threshold.  The cooldown is still
    /// measured from boot.
    Armed,
}

/// Encoding of outbound weight and alarm payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    /// Bare decimal strings: `"123"`, `"1"`.
    #[default]
    Plain,
    /// `{"value": n}` objects, as consumed by the control server.
    Json,
}

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    // --- Identity ---
    /// Sensor id substituted into `mailbox/{id}/...`.  `None` derives
    /// `mb-xxyyzz` from the factory MAC.
    pub sensor_id: Option<String>,
    /// MQTT client id.  `None` derives `mailwatch-xxyyzz` from the MAC.
    pub mqtt_client_id: Option<String>,

    // --- Network ---
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// Broker URL, e.g. `mqtt://192.168.1.10:1883`.
    pub mqtt_broker_url: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,

    // --- Alarm ---
    /// Threshold (grams) used until an `arm_alarm` carries a new one.
    pub default_threshold_grams: i32,
    /// Quiet period after a disarm (milliseconds).
    pub cooldown_ms: u64,
    pub boot_state: BootState,

    // --- Sensor ---
    /// Raw HX711 conversions averaged into one sample.
    pub sample_count: u8,
    /// Raw counts per gram.
    pub calibration_factor: f32,
    /// Zero the scale at boot.
    pub tare_on_boot: bool,
    /// Max wait for HX711 data-ready per conversion (milliseconds).
    pub sensor_ready_timeout_ms: u32,

    // --- Timing ---
    /// Control loop period (milliseconds).
    pub loop_interval_ms: u32,
    /// Fixed delay between reconnect attempts (milliseconds).
    pub reconnect_backoff_ms: u32,
    /// MQTT connect attempts per control cycle before giving up until the
    /// next cycle.
    pub mqtt_connect_attempts: u32,
    /// Wi-Fi attempts at boot.  `None` retries until connected.
    pub wifi_connect_attempts: Option<u32>,

    // --- Output ---
    pub payload_format: PayloadFormat,
    /// Buzzer chirp at power-on (milliseconds, 0 = silent).
    pub startup_chirp_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // Identity
            sensor_id: None,
            mqtt_client_id: None,

            // Network
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            mqtt_broker_url: String::from("mqtt://127.0.0.1:1883"),
            mqtt_username: None,
            mqtt_password: None,

            // Alarm
            default_threshold_grams: 200,
            cooldown_ms: 300_000, // 5 min
            boot_state: BootState::Disarmed,

            // Sensor
            sample_count: 10,
            calibration_factor: -582.72,
            tare_on_boot: true,
            sensor_ready_timeout_ms: 200,

            // Timing
            loop_interval_ms: 1000, // 1 Hz
            reconnect_backoff_ms: 5000,
            mqtt_connect_attempts: 3,
            wifi_connect_attempts: None,

            // Output
            payload_format: PayloadFormat::Plain,
            startup_chirp_ms: 500,
        }
    }
}

impl DeviceConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            warn!("Config JSON rejected: {}", e);
            ConfigError::Malformed
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field the control loop depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_threshold_grams <= 0 {
            return Err(ConfigError::ValidationFailed(
                "default_threshold_grams must be > 0",
            ));
        }
        if self.sample_count == 0 {
            return Err(ConfigError::ValidationFailed("sample_count must be > 0"));
        }
        if self.calibration_factor == 0.0 || !self.calibration_factor.is_finite() {
            return Err(ConfigError::ValidationFailed(
                "calibration_factor must be finite and non-zero",
            ));
        }
        if self.loop_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("loop_interval_ms must be > 0"));
        }
        if self.mqtt_connect_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "mqtt_connect_attempts must be > 0",
            ));
        }
        if self.wifi_connect_attempts == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "wifi_connect_attempts must be > 0 when set",
            ));
        }
        if let Some(id) = &self.sensor_id {
            validate_sensor_id(id)?;
        }
        Ok(())
    }
}

/// Build-time inputs, captured with `option_env!` by the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildEnv<'a> {
    /// Whole config document; takes precedence over everything below.
    pub config_json: Option<&'a str>,
    pub wifi_ssid: Option<&'a str>,
    pub wifi_password: Option<&'a str>,
    pub mqtt_url: Option<&'a str>,
    pub mqtt_user: Option<&'a str>,
    pub mqtt_password: Option<&'a str>,
}

impl DeviceConfig {
    /// Resolve the boot configuration.
    ///
    /// A valid `config_json` wins.  Otherwise defaults plus the individual
    /// network variables.  Anything invalid falls back to defaults with a
    /// warning; a bad config never stops the device.
    pub fn from_build_env(env: &BuildEnv<'_>) -> Self {
        if let Some(json) = env.config_json {
            match Self::from_json(json) {
                Ok(config) => {
                    info!("Config loaded from MAILWATCH_CONFIG_JSON");
                    return config;
                }
                Err(e) => warn!("MAILWATCH_CONFIG_JSON rejected ({}), using defaults", e),
            }
        }

        let mut config = Self::default();
        if let Some(v) = env.wifi_ssid {
            config.wifi_ssid = v.to_string();
        }
        if let Some(v) = env.wifi_password {
            config.wifi_password = v.to_string();
        }
        if let Some(v) = env.mqtt_url {
            config.mqtt_broker_url = v.to_string();
        }
        config.mqtt_username = env.mqtt_user.filter(|v| !v.is_empty()).map(str::to_string);
        config.mqtt_password = env.mqtt_password.filter(|v| !v.is_empty()).map(str::to_string);
        config
    }
}
