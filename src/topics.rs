//! MQTT topic set for one device.
//!
//! Built once from the sensor id at startup; every inbound topic is then
//! matched with plain string equality against these precomputed values.
//!
//! ```text
//!   mailbox/{id}/arm_alarm     ◀── inbound
//!   mailbox/{id}/disarm_alarm  ◀── inbound
//!   mailbox/{id}/weight        ──▶ outbound, every cycle
//!   mailbox/{id}/alarm         ──▶ outbound, once per latch
//! ```

use core::fmt::Write;

use crate::error::ConfigError;

/// Longest accepted sensor id.
pub const MAX_SENSOR_ID_LEN: usize = 32;

/// Capacity of one topic string: `mailbox/` + id + `/disarm_alarm`.
pub const TOPIC_CAP: usize = 64;

pub type Topic = heapless::String<TOPIC_CAP>;

/// Which inbound topic a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundTopic {
    Arm,
    Disarm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    arm: Topic,
    disarm: Topic,
    weight: Topic,
    alarm: Topic,
}

impl Topics {
    pub fn new(sensor_id: &str) -> Result<Self, ConfigError> {
        validate_sensor_id(sensor_id)?;
        Ok(Self {
            arm: build(sensor_id, "arm_alarm")?,
            disarm: build(sensor_id, "disarm_alarm")?,
            weight: build(sensor_id, "weight")?,
            alarm: build(sensor_id, "alarm")?,
        })
    }

    pub fn arm(&self) -> &str {
        &self.arm
    }

    pub fn disarm(&self) -> &str {
        &self.disarm
    }

    pub fn weight(&self) -> &str {
        &self.weight
    }

    pub fn alarm(&self) -> &str {
        &self.alarm
    }

    /// Topics the device must subscribe to after every (re)connect.
    pub fn subscriptions(&self) -> [&str; 2] {
        [self.disarm(), self.arm()]
    }

    /// Exact-match an inbound topic.
    pub fn classify(&self, topic: &str) -> Option<InboundTopic> {
        if topic == self.disarm.as_str() {
            Some(InboundTopic::Disarm)
        } else if topic == self.arm.as_str() {
            Some(InboundTopic::Arm)
        } else {
            None
        }
    }
}

fn build(sensor_id: &str, leaf: &str) -> Result<Topic, ConfigError> {
    let mut t = Topic::new();
    write!(t, "mailbox/{sensor_id}/{leaf}")
        .map_err(|_| ConfigError::ValidationFailed("topic exceeds capacity"))?;
    Ok(t)
}

/// A sensor id must be a single, wildcard-free topic level.
pub fn validate_sensor_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() || id.len() > MAX_SENSOR_ID_LEN {
        return Err(ConfigError::ValidationFailed(
            "sensor_id must be 1-32 characters",
        ));
    }
    let ok = id
        .bytes()
        .all(|b| (0x21..=0x7E).contains(&b) && !matches!(b, b'/' | b'+' | b'#'));
    if !ok {
        return Err(ConfigError::ValidationFailed(
            "sensor_id must be printable ASCII without '/', '+', '#' or spaces",
        ));
    }
    Ok(())
}
