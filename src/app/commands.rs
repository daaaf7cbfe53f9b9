//! Inbound commands and the MQTT command decoder.
//!
//! ```text
//!   (topic, payload) ──▶ decode() ──▶ Decoded::Command(Arm | Disarm)
//!                                  ├─▶ Decoded::Degraded(Arm(None), why)
//!                                  └─▶ Decoded::Unrecognized
//! ```
//!
//! Decoding never fails.  A bad `arm_alarm` payload still arms the device
//! with the threshold it already had; the [`PayloadError`] only feeds the
//! diagnostics.

use serde_json::Value;

use crate::error::PayloadError;
use crate::topics::{InboundTopic, Topics};

/// Commands that the MQTT adapter can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Arm the alarm, optionally replacing the threshold (grams, > 0).
    Arm(Option<i32>),
    /// Disarm, clear the latch and restart the cooldown.
    Disarm,
}

/// Result of decoding one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Command(Command),
    /// The command still applies; the payload part was unusable.
    Degraded(Command, PayloadError),
    /// Not one of our inbound topics.
    Unrecognized,
}

/// Turn an inbound MQTT message into a [`Decoded`] command.
pub fn decode(topics: &Topics, topic: &str, payload: &[u8]) -> Decoded {
    match topics.classify(topic) {
        Some(InboundTopic::Disarm) => Decoded::Command(Command::Disarm),
        Some(InboundTopic::Arm) => match parse_threshold(payload) {
            Ok(grams) => Decoded::Command(Command::Arm(Some(grams))),
            Err(e) => Decoded::Degraded(Command::Arm(None), e),
        },
        None => Decoded::Unrecognized,
    }
}

/// Parse an `arm_alarm` payload.
///
/// Accepts a trimmed decimal integer or a `{"value": n}` object; `n` is
/// rounded to the nearest gram.  An empty payload is
/// [`PayloadError::Empty`]: the arm still applies, but it is reported.
pub fn parse_threshold(payload: &[u8]) -> Result<i32, PayloadError> {
    let text = core::str::from_utf8(payload)
        .map_err(|_| PayloadError::NotANumber)?
        .trim();

    if text.is_empty() {
        return Err(PayloadError::Empty);
    }

    if text.starts_with('{') {
        return parse_json_value(text);
    }

    match text.parse::<i64>() {
        Ok(v) => check_range(v),
        Err(_) if looks_like_integer(text) => Err(PayloadError::OutOfRange),
        Err(_) => Err(PayloadError::NotANumber),
    }
}

fn parse_json_value(text: &str) -> Result<i32, PayloadError> {
    let doc: Value = serde_json::from_str(text).map_err(|_| PayloadError::NotANumber)?;
    let n = doc
        .get("value")
        .and_then(Value::as_f64)
        .ok_or(PayloadError::NotANumber)?;

    let rounded = n.round();
    if !rounded.is_finite() {
        return Err(PayloadError::OutOfRange);
    }
    if rounded <= 0.0 {
        return Err(PayloadError::NonPositive);
    }
    if rounded > i32::MAX as f64 {
        return Err(PayloadError::OutOfRange);
    }
    Ok(rounded as i32)
}

fn check_range(v: i64) -> Result<i32, PayloadError> {
    if v <= 0 {
        return Err(PayloadError::NonPositive);
    }
    i32::try_from(v).map_err(|_| PayloadError::OutOfRange)
}

/// Optional sign followed by digits only, i.e. a number too long for `i64`.
fn looks_like_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
