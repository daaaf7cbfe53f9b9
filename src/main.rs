//! Mailwatch Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single fixed-cadence control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LoadCell (HX711)   Buzzer        MqttAdapter    SystemClock    │
//! │  (WeightSensor)     (BuzzerPort)  (Messaging)    (Clock+Delay)  │
//! │  WifiAdapter (boot) LogEventSink (EventSink)                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        ControlLoop → AppService (pure logic)           │    │
//! │  │        decode · FSM (Disarmed/Watching/Latched)        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pin map (ESP32 DevKit):
//!
//! | Signal      | GPIO |
//! |-------------|------|
//! | HX711 DOUT  | 2    |
//! | HX711 SCK   | 4    |
//! | Buzzer      | 15   |
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::Delay;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use mailwatch::adapters::device_id;
use mailwatch::adapters::log_sink::LogEventSink;
use mailwatch::adapters::mqtt::{MqttAdapter, MQTT_INBOX, MQTT_LINK};
use mailwatch::adapters::time::SystemClock;
use mailwatch::adapters::wifi::{WifiAdapter, WifiCredentials};
use mailwatch::app::ports::BrokerCredentials;
use mailwatch::app::service::AppService;
use mailwatch::config::{BuildEnv, DeviceConfig};
use mailwatch::control::backoff::RetryPolicy;
use mailwatch::control::{ControlLoop, LoopSettings, Ports};
use mailwatch::drivers::buzzer::Buzzer;
use mailwatch::error::Error;
use mailwatch::sensors::load_cell::LoadCell;
use mailwatch::topics::Topics;

/// Max wait for the broker's CONNACK per connect attempt.
const MQTT_CONNECT_TIMEOUT_MS: u32 = 5000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Mailwatch v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (baked in at build time) ─────────────
    let config = DeviceConfig::from_build_env(&BuildEnv {
        config_json: option_env!("MAILWATCH_CONFIG_JSON"),
        wifi_ssid: option_env!("MAILWATCH_WIFI_SSID"),
        wifi_password: option_env!("MAILWATCH_WIFI_PASSWORD"),
        mqtt_url: option_env!("MAILWATCH_MQTT_URL"),
        mqtt_user: option_env!("MAILWATCH_MQTT_USER"),
        mqtt_password: option_env!("MAILWATCH_MQTT_PASSWORD"),
    });

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut clock = SystemClock::new();

    // ── 3. Buzzer + power-on chirp ────────────────────────────
    let mut buzzer = Buzzer::new(PinDriver::output(peripherals.pins.gpio15)?);
    buzzer.chirp(config.startup_chirp_ms, &mut Delay::new_default());

    // ── 4. Load cell ──────────────────────────────────────────
    let mut load_cell = LoadCell::new(
        PinDriver::input(peripherals.pins.gpio2)?,
        PinDriver::output(peripherals.pins.gpio4)?,
        Delay::new_default(),
        config.calibration_factor,
        config.sensor_ready_timeout_ms,
    );
    if config.tare_on_boot {
        match load_cell.tare(config.sample_count) {
            Ok(()) => info!("Load cell tared, offset={:.0}", load_cell.offset()),
            // Keep going: samples are skipped until the HX711 answers.
            Err(e) => warn!("Tare failed ({}), weights are uncorrected", e),
        }
    }

    // ── 5. Identity + topics ──────────────────────────────────
    let mac = device_id::read_mac();
    let sensor_id = config
        .sensor_id
        .clone()
        .unwrap_or_else(|| device_id::sensor_id(&mac).to_string());
    let client_id = config
        .mqtt_client_id
        .clone()
        .unwrap_or_else(|| device_id::client_id(&mac).to_string());
    let topics = Topics::new(&sensor_id).map_err(Error::from)?;
    info!("Sensor id '{}', publishing to {}", sensor_id, topics.weight());

    // ── 6. WiFi (blocking, bounded unless configured otherwise) ──
    let wifi_policy = match config.wifi_connect_attempts {
        Some(n) => RetryPolicy::limited(n, config.reconnect_backoff_ms),
        None => RetryPolicy::unbounded(config.reconnect_backoff_ms),
    };
    let credentials = WifiCredentials::new(&config.wifi_ssid, &config.wifi_password)?;
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs, credentials)?;
    if let Err(e) = wifi.connect(&wifi_policy, &mut clock) {
        error!("WiFi unavailable ({}), restarting", e);
        return Err(e.into());
    }

    // ── 7. MQTT + control loop ────────────────────────────────
    let mqtt = MqttAdapter::new(&MQTT_INBOX, &MQTT_LINK, MQTT_CONNECT_TIMEOUT_MS);
    let broker = BrokerCredentials::from_config(&config, client_id);
    let app = AppService::new(&config, topics);

    let mut control = ControlLoop::new(
        app,
        Ports {
            sensor: load_cell,
            mqtt,
            buzzer,
            clock,
            delay: SystemClock::new(),
            sink: LogEventSink::new(),
        },
        LoopSettings::from_config(&config),
        broker,
    );

    // `wifi` must outlive the loop; run() never returns.
    let _wifi = wifi;
    control.run()
}
