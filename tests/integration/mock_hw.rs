//! Mock adapters for integration tests.
//!
//! Every port records what the domain asked of it so tests can assert on
//! the full history without real GPIO or a broker.  Time is manual: the
//! clock only moves when a test advances it or the loop sleeps.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use mailwatch::app::events::AppEvent;
use mailwatch::app::ports::{
    BrokerCredentials, BuzzerPort, ClockPort, DelayPort, EventSink, MessagingPort, WeightSensorPort,
};
use mailwatch::error::{SensorError, TransportError};

// ── Scripted load cell ────────────────────────────────────────

/// Plays back one entry per cycle.  `None` means "not ready"; an empty
/// script is permanently not ready.
#[derive(Default)]
pub struct ScriptedSensor {
    script: VecDeque<Option<f32>>,
    pub reads: u32,
}

#[allow(dead_code)]
impl ScriptedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(readings: &[Option<f32>]) -> Self {
        Self {
            script: readings.iter().copied().collect(),
            reads: 0,
        }
    }

    pub fn push(&mut self, grams: f32) {
        self.script.push_back(Some(grams));
    }

    pub fn push_not_ready(&mut self) {
        self.script.push_back(None);
    }
}

impl WeightSensorPort for ScriptedSensor {
    fn is_ready(&mut self) -> bool {
        match self.script.front() {
            Some(Some(_)) => true,
            Some(None) => {
                self.script.pop_front();
                false
            }
            None => false,
        }
    }

    fn read_grams(&mut self, _samples: u8) -> Result<f32, SensorError> {
        self.reads += 1;
        match self.script.pop_front() {
            Some(Some(grams)) => Ok(grams),
            _ => Err(SensorError::NotReady),
        }
    }
}

// ── Broker ────────────────────────────────────────────────────

pub struct MockBroker {
    connected: bool,
    /// Broker accepts connections.
    pub reachable: bool,
    /// Refuse this many connects before accepting.
    pub refuse_connects: u32,
    pub connect_calls: u32,
    /// Every subscribe ever issued, in order.
    pub subscriptions: Vec<String>,
    /// Every successful publish as `(topic, payload)`.
    pub published: Vec<(String, String)>,
    pub last_credentials: Option<BrokerCredentials>,
    inbound: VecDeque<(String, Vec<u8>)>,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new() -> Self {
        Self {
            connected: false,
            reachable: true,
            refuse_connects: 0,
            connect_calls: 0,
            subscriptions: Vec::new(),
            published: Vec::new(),
            last_credentials: None,
            inbound: VecDeque::new(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }

    /// Queue a message as if the broker delivered it.
    pub fn deliver(&mut self, topic: &str, payload: &str) {
        self.inbound
            .push_back((topic.to_string(), payload.as_bytes().to_vec()));
    }

    /// Drop the session without telling the client.
    pub fn drop_session(&mut self) {
        self.connected = false;
    }

    pub fn published_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagingPort for MockBroker {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self, credentials: &BrokerCredentials) -> Result<(), TransportError> {
        self.connect_calls += 1;
        self.last_credentials = Some(credentials.clone());
        if !self.reachable {
            return Err(TransportError::ConnectFailed);
        }
        if self.refuse_connects > 0 {
            self.refuse_connects -= 1;
            return Err(TransportError::ConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.published.push((
            topic.to_string(),
            String::from_utf8_lossy(payload).into_owned(),
        ));
        Ok(())
    }

    fn drain_inbound(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
        while let Some((topic, payload)) = self.inbound.pop_front() {
            handler(&topic, &payload);
        }
    }
}

// ── Buzzer ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBuzzer {
    on: bool,
    /// Number of writes that reached the pin.
    pub writes: u32,
}

impl MockBuzzer {
    pub fn is_on_now(&self) -> bool {
        self.on
    }
}

impl BuzzerPort for MockBuzzer {
    fn set_alarm(&mut self, on: bool) {
        self.on = on;
        self.writes += 1;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

// ── Manual time ───────────────────────────────────────────────

/// Clock handle shared between the test and the loop.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    /// A delay that moves this clock forward instead of sleeping.
    pub fn delay(&self) -> ManualDelay {
        ManualDelay {
            clock: self.clone(),
            slept: Vec::new(),
        }
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

pub struct ManualDelay {
    clock: ManualClock,
    /// Every requested delay, in order.
    pub slept: Vec<u32>,
}

#[allow(dead_code)]
impl ManualDelay {
    pub fn total_ms(&self) -> u64 {
        self.slept.iter().map(|&ms| u64::from(ms)).sum()
    }
}

impl DelayPort for ManualDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.slept.push(ms);
        self.clock.advance(u64::from(ms));
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct VecSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl VecSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for VecSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
