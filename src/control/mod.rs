//! Fixed-cadence control loop.
//!
//! ```text
//!  ┌──────────── one cycle ─────────────────────────────────────────┐
//!  │ 1. connectivity   reconnect + re-subscribe (bounded backoff)  │
//!  │ 2. drain inbox    decode → AppService::handle_message          │
//!  │ 3. sample         WeightSensorPort (not ready → no sample)     │
//!  │ 4. evaluate       AppService::evaluate → alarm publish (once)  │
//!  │ 5. weight         publish fresh / last good / 0                │
//!  └────────────────────────────────────────────────────────────────┘
//!        then sleep loop_interval_ms minus the time the cycle took
//! ```
//!
//! The loop owns every port.  All state mutation happens on this thread;
//! the MQTT task only fills the inbox drained in step 2.

pub mod backoff;
pub mod payload;

use log::{debug, error, info};

use crate::app::events::AppEvent;
use crate::app::ports::{
    BrokerCredentials, BuzzerPort, ClockPort, DelayPort, EventSink, MessagingPort, WeightSensorPort,
};
use crate::app::service::{AppService, Evaluation};
use crate::config::{DeviceConfig, PayloadFormat};
use crate::error::{SensorError, TransportError};
use crate::fsm::context::WeightSample;

use backoff::{retry, RetryPolicy};
use payload::{encode_value, ALARM_VALUE};

/// Loop tuning taken from [`DeviceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub sample_count: u8,
    pub loop_interval_ms: u32,
    pub reconnect: RetryPolicy,
    pub payload_format: PayloadFormat,
}

impl LoopSettings {
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            sample_count: config.sample_count,
            loop_interval_ms: config.loop_interval_ms,
            reconnect: RetryPolicy::limited(
                config.mqtt_connect_attempts,
                config.reconnect_backoff_ms,
            ),
            payload_format: config.payload_format,
        }
    }
}

/// Every adapter the loop drives.
pub struct Ports<S, M, B, C, D, E> {
    pub sensor: S,
    pub mqtt: M,
    pub buzzer: B,
    pub clock: C,
    pub delay: D,
    pub sink: E,
}

/// What happened during one [`ControlLoop::run_cycle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    /// Connected at the end of step 1.
    pub connected: bool,
    /// Step 1 had to (re)connect and succeeded.
    pub reconnected: bool,
    /// Set when step 1 gave up; always [`TransportError::Unavailable`].
    pub link_error: Option<TransportError>,
    /// Inbound messages drained in step 2.
    pub messages: usize,
    pub sample: Option<WeightSample>,
    pub evaluation: Evaluation,
    pub alarm_published: bool,
    /// Whole grams sent (or attempted) on the weight topic.
    pub weight_grams: i32,
    pub weight_published: bool,
    pub elapsed_ms: u64,
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop<S, M, B, C, D, E> {
    app: AppService,
    ports: Ports<S, M, B, C, D, E>,
    settings: LoopSettings,
    credentials: BrokerCredentials,
    /// Last finite sample, republished while the sensor is not ready.
    last_weight: Option<WeightSample>,
    /// The previous cycle produced no sample.
    sensor_down: bool,
    cycles: u64,
}

impl<S, M, B, C, D, E> ControlLoop<S, M, B, C, D, E>
where
    S: WeightSensorPort,
    M: MessagingPort,
    B: BuzzerPort,
    C: ClockPort,
    D: DelayPort,
    E: EventSink,
{
    pub fn new(
        app: AppService,
        ports: Ports<S, M, B, C, D, E>,
        settings: LoopSettings,
        credentials: BrokerCredentials,
    ) -> Self {
        Self {
            app,
            ports,
            settings,
            credentials,
            last_weight: None,
            sensor_down: false,
            cycles: 0,
        }
    }

    /// Start the application service.  The cooldown is measured from here.
    pub fn start(&mut self) {
        let now = self.ports.clock.now_ms();
        let Ports { buzzer, sink, .. } = &mut self.ports;
        self.app.start(now, buzzer, sink);
    }

    /// Start, then cycle forever at `loop_interval_ms`.
    pub fn run(&mut self) -> ! {
        self.start();
        info!(
            "Control loop running every {} ms",
            self.settings.loop_interval_ms
        );
        loop {
            let report = self.run_cycle();
            let spent = u32::try_from(report.elapsed_ms).unwrap_or(u32::MAX);
            let rest = self.settings.loop_interval_ms.saturating_sub(spent);
            if rest > 0 {
                self.ports.delay.delay_ms(rest);
            }
        }
    }

    /// Execute one cycle: connectivity, drain, sample, evaluate, publish.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let started = self.ports.clock.now_ms();

        // 1. Connectivity
        let link = self.ensure_connected();
        let connected = link.is_ok();
        let reconnected = link.unwrap_or(false);

        // 2. Commands
        let messages = self.drain_inbox();

        // 3. Sample
        let sample = self.acquire_sample();
        if sample.is_some() {
            self.last_weight = sample;
        }

        // 4. Evaluate
        let now = self.ports.clock.now_ms();
        let evaluation = {
            let Ports { buzzer, sink, .. } = &mut self.ports;
            self.app.evaluate(sample, now, buzzer, sink)
        };

        let topics = self.app.topics();
        let Ports { mqtt, sink, clock, .. } = &mut self.ports;
        let format = self.settings.payload_format;

        let alarm_published = match evaluation {
            Evaluation::AlarmRaised(_) => {
                publish_value(mqtt, sink, topics.alarm(), format, ALARM_VALUE)
            }
            _ => false,
        };

        // 5. Weight, every cycle
        let weight_grams = self.last_weight.map_or(0, |s| s.whole_grams());
        let weight_published = publish_value(mqtt, sink, topics.weight(), format, weight_grams);

        let elapsed_ms = clock.now_ms().saturating_sub(started);
        debug!(
            "Cycle {}: {} msg, weight {} g, {:?}, {} ms",
            self.cycles, messages, weight_grams, evaluation, elapsed_ms
        );

        CycleReport {
            connected,
            reconnected,
            link_error: link.err(),
            messages,
            sample,
            evaluation,
            alarm_published,
            weight_grams,
            weight_published,
            elapsed_ms,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn app(&self) -> &AppService {
        &self.app
    }

    pub fn ports(&self) -> &Ports<S, M, B, C, D, E> {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut Ports<S, M, B, C, D, E> {
        &mut self.ports
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    // ── Steps ─────────────────────────────────────────────────

    /// `Ok(true)` after a fresh (re)connect, `Ok(false)` if already up.
    /// Exhausting the retry policy is reported as
    /// [`TransportError::Unavailable`].
    fn ensure_connected(&mut self) -> Result<bool, TransportError> {
        if self.ports.mqtt.is_connected() {
            return Ok(false);
        }

        let Ports { mqtt, delay, sink, .. } = &mut self.ports;
        let credentials = &self.credentials;
        let topics = self.app.topics();

        let result = retry("MQTT connect", &self.settings.reconnect, delay, |_| {
            mqtt.connect(credentials)?;
            for topic in topics.subscriptions() {
                mqtt.subscribe(topic)?;
            }
            Ok::<(), TransportError>(())
        });

        match result {
            Ok(()) => {
                info!("MQTT session up, subscribed to {:?}", topics.subscriptions());
                sink.emit(&AppEvent::TransportRestored);
                Ok(true)
            }
            Err(last) => {
                error!("MQTT unavailable this cycle, last attempt: {}", last);
                sink.emit(&AppEvent::TransportUnavailable);
                Err(TransportError::Unavailable)
            }
        }
    }

    fn drain_inbox(&mut self) -> usize {
        let Ports { mqtt, buzzer, clock, sink, .. } = &mut self.ports;
        let app = &mut self.app;
        let mut count = 0;
        mqtt.drain_inbound(&mut |topic: &str, payload: &[u8]| {
            count += 1;
            app.handle_message(topic, payload, clock.now_ms(), &mut *buzzer, &mut *sink);
        });
        count
    }

    fn acquire_sample(&mut self) -> Option<WeightSample> {
        let sample = self.read_sample();
        match (sample.is_some(), self.sensor_down) {
            (true, true) => {
                self.sensor_down = false;
                self.ports.sink.emit(&AppEvent::SensorRestored);
            }
            (false, false) => self.sensor_down = true,
            _ => {}
        }
        sample
    }

    fn read_sample(&mut self) -> Option<WeightSample> {
        let Ports { sensor, sink, .. } = &mut self.ports;

        if !sensor.is_ready() {
            debug!("Load cell not ready, skipping sample");
            sink.emit(&AppEvent::SensorNotReady(SensorError::NotReady));
            return None;
        }

        match sensor.read_grams(self.settings.sample_count) {
            Ok(grams) if grams.is_finite() => Some(WeightSample::new(grams)),
            Ok(grams) => {
                debug!("Discarding non-finite reading: {}", grams);
                sink.emit(&AppEvent::SensorNotReady(SensorError::PinFault));
                None
            }
            Err(e) => {
                debug!("Load cell read failed: {}", e);
                sink.emit(&AppEvent::SensorNotReady(e));
                None
            }
        }
    }
}

fn publish_value(
    mqtt: &mut impl MessagingPort,
    sink: &mut impl EventSink,
    topic: &str,
    format: PayloadFormat,
    value: i32,
) -> bool {
    let payload = encode_value(format, value);
    match mqtt.publish(topic, payload.as_bytes()) {
        Ok(()) => true,
        Err(e) => {
            debug!("Publish to '{}' failed: {}", topic, e);
            sink.emit(&AppEvent::PublishFailed(e));
            false
        }
    }
}
