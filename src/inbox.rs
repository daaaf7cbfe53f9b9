//! Inbound MQTT hand-off between the MQTT task and the control loop.
//!
//! Uses an `embassy-sync` bounded channel so the ESP-IDF event callback
//! never touches domain state.  The callback only copies the message in;
//! the control loop drains it at the start of each cycle.
//!
//! ```text
//! ┌──────────────┐  InboundMessage  ┌──────────────┐
//! │  MQTT task   │─────────────────▶│ Control Loop │
//! │  (callback)  │    depth 8       │   (drain)    │
//! └──────────────┘                  └──────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{String, Vec};
use log::warn;

use crate::topics::TOPIC_CAP;

/// Channel depth for inbound messages.
pub const INBOX_DEPTH: usize = 8;

/// Largest payload kept.  Threshold commands are a handful of bytes.
pub const PAYLOAD_CAP: usize = 128;

/// One message copied out of the MQTT client's buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String<TOPIC_CAP>,
    pub payload: Vec<u8, PAYLOAD_CAP>,
}

impl InboundMessage {
    /// `None` if either part exceeds its fixed capacity.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = String::new();
        t.push_str(topic).ok()?;
        let p = Vec::from_slice(payload).ok()?;
        Some(Self { topic: t, payload: p })
    }
}

/// Why a message did not make it into the inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Topic or payload exceeds [`InboundMessage`] capacity.
    Oversized,
    /// The control loop has not drained the previous messages yet.
    Full,
}

pub struct Inbox {
    channel: Channel<CriticalSectionRawMutex, InboundMessage, INBOX_DEPTH>,
    dropped: AtomicU32,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Copy a message in.  Never blocks; drops with a warning instead.
    pub fn push(&self, topic: &str, payload: &[u8]) -> Result<(), Rejected> {
        let result = match InboundMessage::new(topic, payload) {
            Some(msg) => self.channel.try_send(msg).map_err(|_| Rejected::Full),
            None => Err(Rejected::Oversized),
        };
        if let Err(why) = result {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                "Inbox dropped message on '{}' ({} bytes): {:?}, {} dropped so far",
                topic,
                payload.len(),
                why,
                total
            );
        }
        result
    }

    /// Hand every queued message to `handler`, oldest first.
    pub fn drain(&self, handler: &mut dyn FnMut(&str, &[u8])) -> usize {
        let mut n = 0;
        while let Ok(msg) = self.channel.try_receive() {
            handler(&msg.topic, &msg.payload);
            n += 1;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Messages lost to overflow or size since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
