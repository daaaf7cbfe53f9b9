//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the FSM and the [`DeviceState`] it runs on.  It
//! exposes a clean, hardware-agnostic API.  All I/O flows through port
//! traits injected at call sites, making the entire service testable with
//! mock adapters.
//!
//! ```text
//!  (topic, payload) ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                       │      AppService         │
//!   WeightSample    ──▶ │  decode · FSM · latch   │ ──▶ BuzzerPort
//!                       └────────────────────────┘
//! ```

use log::{info, trace, warn};

use crate::config::{BootState, DeviceConfig};
use crate::fsm::context::{DeviceState, WeightSample};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::topics::Topics;

use super::commands::{decode, Command, Decoded};
use super::events::AppEvent;
use super::ports::{BuzzerPort, EventSink};

/// What a sample did to the alarm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// No sample, or the alarm was not watching.
    NotEvaluated,
    /// Watched and did not latch.
    Quiet,
    /// Latched on this sample.  The caller owes one alarm publish.
    AlarmRaised(WeightSample),
}

/// Read-only view of the alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub armed: bool,
    pub threshold_grams: i32,
    pub last_disarm_ms: u64,
    pub alarm_latched: bool,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    state: DeviceState,
    topics: Topics,
    boot_state: BootState,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: &DeviceConfig, topics: Topics) -> Self {
        let state = DeviceState::new(config.default_threshold_grams, config.cooldown_ms);
        let fsm = Fsm::new(build_state_table(), StateId::Disarmed);

        Self {
            fsm,
            state,
            topics,
            boot_state: config.boot_state,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start in `Disarmed` with the cooldown measured from `now_ms`.
    /// An armed boot is applied as an explicit `Arm` right after.
    pub fn start(&mut self, now_ms: u64, buzzer: &mut impl BuzzerPort, sink: &mut impl EventSink) {
        self.state.now_ms = now_ms;
        self.state.last_disarm_ms = now_ms;
        self.fsm.start(&mut self.state);
        self.apply_buzzer(buzzer);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {:?}", self.fsm.current_state());

        if self.boot_state == BootState::Armed {
            info!("Boot state is armed, arming with default threshold");
            self.handle_command(Command::Arm(None), now_ms, buzzer, sink);
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Decode and apply one inbound MQTT message.
    pub fn handle_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        now_ms: u64,
        buzzer: &mut impl BuzzerPort,
        sink: &mut impl EventSink,
    ) {
        match decode(&self.topics, topic, payload) {
            Decoded::Command(cmd) => self.handle_command(cmd, now_ms, buzzer, sink),
            Decoded::Degraded(cmd, why) => {
                warn!("Ignoring threshold in '{}' payload: {}", topic, why);
                sink.emit(&AppEvent::PayloadRejected(why));
                self.handle_command(cmd, now_ms, buzzer, sink);
            }
            Decoded::Unrecognized => trace!("Ignoring message on '{}'", topic),
        }
    }

    /// Apply a decoded command.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        now_ms: u64,
        buzzer: &mut impl BuzzerPort,
        sink: &mut impl EventSink,
    ) {
        let prev = self.fsm.current_state();
        self.state.now_ms = now_ms;

        match cmd {
            Command::Disarm => {
                self.state.last_disarm_ms = now_ms;
                self.fsm.force_transition(StateId::Disarmed, &mut self.state);
                // Already disarmed: on_enter did not run.
                self.state.outputs.buzzer_on = false;
                self.state.outputs.alarm_pending = false;
                self.apply_buzzer(buzzer);
                self.emit_transition(prev, sink);
                sink.emit(&AppEvent::Disarmed { at_ms: now_ms });
            }
            Command::Arm(threshold) => {
                if let Some(grams) = threshold {
                    self.state.threshold_grams = grams;
                }
                self.fsm.force_transition(StateId::Watching, &mut self.state);
                self.apply_buzzer(buzzer);
                self.emit_transition(prev, sink);
                sink.emit(&AppEvent::Armed {
                    threshold_grams: self.state.threshold_grams,
                    threshold_updated: threshold.is_some(),
                });
            }
        }
    }

    // ── Per-sample evaluation ─────────────────────────────────

    /// Feed one sample (or its absence) to the FSM.
    pub fn evaluate(
        &mut self,
        sample: Option<WeightSample>,
        now_ms: u64,
        buzzer: &mut impl BuzzerPort,
        sink: &mut impl EventSink,
    ) -> Evaluation {
        let prev = self.fsm.current_state();
        self.state.now_ms = now_ms;
        self.state.sample = sample;

        self.fsm.tick(&mut self.state);
        self.state.sample = None;

        self.apply_buzzer(buzzer);
        self.emit_transition(prev, sink);

        match sample {
            Some(s) if self.state.take_alarm() => {
                sink.emit(&AppEvent::AlarmRaised {
                    weight_grams: s.grams,
                    threshold_grams: self.state.threshold_grams,
                });
                Evaluation::AlarmRaised(s)
            }
            Some(_) if prev == StateId::Watching => Evaluation::Quiet,
            _ => Evaluation::NotEvaluated,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn status(&self) -> DeviceStatus {
        let current = self.fsm.current_state();
        DeviceStatus {
            armed: current.is_armed(),
            threshold_grams: self.state.threshold_grams,
            last_disarm_ms: self.state.last_disarm_ms,
            alarm_latched: current == StateId::Latched,
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_buzzer(&self, buzzer: &mut impl BuzzerPort) {
        let want = self.state.outputs.buzzer_on;
        if buzzer.is_on() != want {
            buzzer.set_alarm(want);
        }
    }

    fn emit_transition(&self, prev: StateId, sink: &mut impl EventSink) {
        let now = self.fsm.current_state();
        if now != prev {
            sink.emit(&AppEvent::StateChanged { from: prev, to: now });
        }
    }
}
