//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) and the control loop
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them; the firmware
//! only logs them.

use crate::error::{PayloadError, SensorError, TransportError};
use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// An arm command was applied.
    Armed {
        threshold_grams: i32,
        /// The command carried a new threshold.
        threshold_updated: bool,
    },

    /// A disarm command was applied; the cooldown restarts at `at_ms`.
    Disarmed { at_ms: u64 },

    /// The alarm latched on this sample.
    AlarmRaised { weight_grams: f32, threshold_grams: i32 },

    /// An `arm_alarm` payload was unusable; the arm went ahead anyway.
    PayloadRejected(PayloadError),

    /// No sample this cycle.
    SensorNotReady(SensorError),

    /// A sample arrived after one or more cycles without.
    SensorRestored,

    /// Reconnect attempts for this cycle are exhausted.
    TransportUnavailable,

    /// Connected and subscribed again.
    TransportRestored,

    /// A publish was dropped.
    PublishFailed(TransportError),
}
