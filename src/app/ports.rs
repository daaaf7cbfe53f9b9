//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService / ControlLoop (domain)
//! ```
//!
//! Driven adapters (load cell, buzzer, MQTT, clock, event sinks) implement
//! these traits.  The [`AppService`](super::service::AppService) and the
//! [`ControlLoop`](crate::control::ControlLoop) consume them via generics,
//! so the domain core never touches hardware directly.

use crate::config::DeviceConfig;
use crate::error::{SensorError, TransportError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the control loop calls this once per cycle.
pub trait WeightSensorPort {
    /// A conversion is available right now.
    fn is_ready(&mut self) -> bool;

    /// Average `samples` conversions into one calibrated gram reading.
    fn read_grams(&mut self, samples: u8) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Buzzer port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

pub trait BuzzerPort {
    /// Drive the alarm output.
    fn set_alarm(&mut self, on: bool);

    fn is_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Messaging port (driven adapter: domain ↔ MQTT broker)
// ───────────────────────────────────────────────────────────────

/// Broker address and login, resolved once at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    pub url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl BrokerCredentials {
    pub fn from_config(config: &DeviceConfig, client_id: String) -> Self {
        Self {
            url: config.mqtt_broker_url.clone(),
            client_id,
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
        }
    }
}

/// Publish/subscribe transport.
///
/// All operations are QoS 0.  Inbound messages are buffered by the
/// adapter and handed over in [`drain_inbound`](Self::drain_inbound) on
/// the control thread.
pub trait MessagingPort {
    /// `true` only while a session confirmed by [`connect`](Self::connect)
    /// is up.  A session the transport re-established on its own reports
    /// `false` until `connect` is called again, so the caller knows to
    /// re-subscribe.
    fn is_connected(&self) -> bool;

    /// Establish (or confirm) a broker session.
    fn connect(&mut self, credentials: &BrokerCredentials) -> Result<(), TransportError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Hand every buffered inbound message to `handler`, oldest first.
    fn drain_inbound(&mut self, handler: &mut dyn FnMut(&str, &[u8]));
}

// ───────────────────────────────────────────────────────────────
// Time ports
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

/// Blocking delay.  Injected so reconnect backoff can run on a manual clock.
pub trait DelayPort {
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
