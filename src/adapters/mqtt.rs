//! MQTT messaging adapter.
//!
//! Implements [`MessagingPort`] on top of the ESP-IDF MQTT client.
//!
//! ```text
//!   ESP-IDF MQTT task                     control thread
//!   ─────────────────                     ──────────────
//!   Connected    ──▶ LinkState.connected
//!   Disconnected ──▶ LinkState.connected = false
//!   Received     ──▶ Inbox::push ────────▶ drain_inbound()
//! ```
//!
//! The client reconnects on its own.  Every `Connected` event marks the
//! session as fresh; [`MessagingPort::is_connected`] stays `false` until
//! the control loop has called `connect` again and re-subscribed.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` with an event callback.
//! - **all other targets**: in-memory loopback for host-side simulation.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::inbox::Inbox;

/// Connection flags written by the MQTT event callback.
pub struct LinkState {
    connected: AtomicBool,
    /// Set on every `Connected` event, cleared once `connect` confirms it.
    fresh_session: AtomicBool,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkState {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            fresh_session: AtomicBool::new(false),
        }
    }

    pub fn on_connected(&self) {
        self.fresh_session.store(true, Ordering::Release);
        self.connected.store(true, Ordering::Release);
    }

    pub fn on_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn is_up(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Up, and no reconnect happened since the last [`confirm`](Self::confirm).
    pub fn is_confirmed(&self) -> bool {
        self.is_up() && !self.fresh_session.load(Ordering::Acquire)
    }

    pub fn confirm(&self) {
        self.fresh_session.store(false, Ordering::Release);
    }
}

/// Inbound queue shared with the MQTT event callback.
pub static MQTT_INBOX: Inbox = Inbox::new();

/// Link flags shared with the MQTT event callback.
pub static MQTT_LINK: LinkState = LinkState::new();

// ───────────────────────────────────────────────────────────────
// ESP-IDF implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp_impl {
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use log::{debug, info, warn};

    use super::LinkState;
    use crate::app::ports::{BrokerCredentials, MessagingPort};
    use crate::error::TransportError;
    use crate::inbox::Inbox;

    const CONNECT_POLL_MS: u32 = 50;

    pub struct MqttAdapter {
        client: Option<EspMqttClient<'static>>,
        inbox: &'static Inbox,
        link: &'static LinkState,
        connect_timeout_ms: u32,
    }

    impl MqttAdapter {
        pub fn new(inbox: &'static Inbox, link: &'static LinkState, connect_timeout_ms: u32) -> Self {
            Self {
                client: None,
                inbox,
                link,
                connect_timeout_ms,
            }
        }

        fn create_client(
            &self,
            credentials: &BrokerCredentials,
        ) -> Result<EspMqttClient<'static>, TransportError> {
            let conf = MqttClientConfiguration {
                client_id: Some(credentials.client_id.as_str()),
                username: credentials.username.as_deref(),
                password: credentials.password.as_deref(),
                ..Default::default()
            };

            let inbox = self.inbox;
            let link = self.link;
            EspMqttClient::new_cb(credentials.url.as_str(), &conf, move |event| {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        info!("MQTT: connected");
                        link.on_connected();
                    }
                    EventPayload::Disconnected => {
                        warn!("MQTT: disconnected");
                        link.on_disconnected();
                    }
                    EventPayload::Received {
                        topic: Some(topic),
                        data,
                        details,
                        ..
                    } => {
                        // Only whole payloads; commands are tiny.
                        if matches!(details, Details::Complete) {
                            let _ = inbox.push(topic, data);
                        } else {
                            warn!("MQTT: dropping fragmented message on '{}'", topic);
                        }
                    }
                    EventPayload::Error(e) => warn!("MQTT: client error: {:?}", e),
                    other => debug!("MQTT: {:?}", other),
                }
            })
            .map_err(|e| {
                warn!("MQTT: client init failed: {}", e);
                TransportError::ConnectFailed
            })
        }
    }

    impl MessagingPort for MqttAdapter {
        fn is_connected(&self) -> bool {
            self.client.is_some() && self.link.is_confirmed()
        }

        fn connect(&mut self, credentials: &BrokerCredentials) -> Result<(), TransportError> {
            if self.client.is_none() {
                info!("MQTT: connecting to {} as '{}'", credentials.url, credentials.client_id);
                self.client = Some(self.create_client(credentials)?);
            }

            let mut waited = 0;
            while !self.link.is_up() {
                if waited >= self.connect_timeout_ms {
                    return Err(TransportError::ConnectFailed);
                }
                FreeRtos::delay_ms(CONNECT_POLL_MS);
                waited += CONNECT_POLL_MS;
            }
            self.link.confirm();
            Ok(())
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
            let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
            client
                .subscribe(topic, QoS::AtMostOnce)
                .map(|_| ())
                .map_err(|e| {
                    warn!("MQTT: subscribe '{}' failed: {}", topic, e);
                    TransportError::SubscribeFailed
                })
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
            if !self.link.is_up() {
                return Err(TransportError::NotConnected);
            }
            let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
            client
                .publish(topic, QoS::AtMostOnce, false, payload)
                .map(|_| ())
                .map_err(|_| TransportError::PublishFailed)
        }

        fn drain_inbound(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
            self.inbox.drain(handler);
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp_impl::MqttAdapter;

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim_impl {
    use log::info;

    use super::LinkState;
    use crate::app::ports::{BrokerCredentials, MessagingPort};
    use crate::error::TransportError;
    use crate::inbox::Inbox;

    /// Loopback broker: publishes are recorded, and a publish to a
    /// subscribed topic is delivered back through the inbox.
    pub struct MqttAdapter {
        inbox: &'static Inbox,
        link: &'static LinkState,
        broker_up: bool,
        subscriptions: Vec<String>,
        published: Vec<(String, Vec<u8>)>,
    }

    impl MqttAdapter {
        pub fn new(inbox: &'static Inbox, link: &'static LinkState, _connect_timeout_ms: u32) -> Self {
            Self {
                inbox,
                link,
                broker_up: true,
                subscriptions: Vec::new(),
                published: Vec::new(),
            }
        }

        /// Simulate the broker going away or coming back.
        pub fn set_broker_up(&mut self, up: bool) {
            self.broker_up = up;
            if up {
                self.link.on_connected();
            } else {
                self.link.on_disconnected();
                self.subscriptions.clear();
            }
        }

        pub fn published(&self) -> &[(String, Vec<u8>)] {
            &self.published
        }

        pub fn subscriptions(&self) -> &[String] {
            &self.subscriptions
        }
    }

    impl MessagingPort for MqttAdapter {
        fn is_connected(&self) -> bool {
            self.link.is_confirmed()
        }

        fn connect(&mut self, credentials: &BrokerCredentials) -> Result<(), TransportError> {
            if !self.broker_up {
                return Err(TransportError::ConnectFailed);
            }
            if !self.link.is_up() {
                info!("MQTT(sim): connected to {} as '{}'", credentials.url, credentials.client_id);
                self.link.on_connected();
            }
            self.link.confirm();
            Ok(())
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
            if !self.link.is_up() {
                return Err(TransportError::NotConnected);
            }
            if !self.subscriptions.iter().any(|s| s == topic) {
                self.subscriptions.push(topic.to_string());
            }
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
            if !self.link.is_up() {
                return Err(TransportError::NotConnected);
            }
            self.published.push((topic.to_string(), payload.to_vec()));
            if self.subscriptions.iter().any(|s| s == topic) {
                let _ = self.inbox.push(topic, payload);
            }
            Ok(())
        }

        fn drain_inbound(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
            self.inbox.drain(handler);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim_impl::MqttAdapter;
