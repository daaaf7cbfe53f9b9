//! Unified error types for the Mailwatch firmware.
//!
//! One small `Copy` enum per subsystem, all funnelling into [`Error`] so the
//! boot path in `main` can propagate with `?`.  None of these are fatal once
//! the device is up: the control loop logs them and carries on.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The load cell could not produce a reading.
    Sensor(SensorError),
    /// The MQTT transport is down or refused an operation.
    Transport(TransportError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// HX711 did not signal data-ready within the wait window.
    NotReady,
    /// A GPIO read or write on the load-cell bus failed.
    PinFault,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "load cell not ready"),
            Self::PinFault => write!(f, "load cell GPIO fault"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Broker unreachable after the configured reconnect attempts.
    Unavailable,
    /// A single connect attempt failed.
    ConnectFailed,
    /// The broker rejected or never acknowledged a subscription.
    SubscribeFailed,
    /// Publish could not be queued.
    PublishFailed,
    /// Operation attempted while disconnected.
    NotConnected,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "MQTT broker unavailable"),
            Self::ConnectFailed => write!(f, "MQTT connect failed"),
            Self::SubscribeFailed => write!(f, "MQTT subscribe failed"),
            Self::PublishFailed => write!(f, "MQTT publish failed"),
            Self::NotConnected => write!(f, "MQTT not connected"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Command payload errors
// ---------------------------------------------------------------------------

/// Why an `arm_alarm` payload could not be used as a threshold.
/// The arm itself still goes through with the previous threshold, so this
/// is reported as an event and never becomes an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// Nothing but whitespace.
    Empty,
    /// Neither a decimal integer nor a `{"value": n}` object.
    NotANumber,
    /// Parsed, but zero or negative.
    NonPositive,
    /// Parsed, but does not fit the threshold range.
    OutOfRange,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "threshold payload is empty"),
            Self::NotANumber => write!(f, "threshold is not a number"),
            Self::NonPositive => write!(f, "threshold must be positive"),
            Self::OutOfRange => write!(f, "threshold out of range"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON document could not be deserialised.
    Malformed,
    /// A field failed range validation.
    /// The `&'static str` names the field and the rule.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "config malformed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
