//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A missing sample or a dropped publish warns once; repeats drop to
//! debug until the matching restored event.

use log::{debug, error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
    /// Repeats logged at debug instead of warn.
    suppressed: u64,
    sensor_down: bool,
    publish_down: bool,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged since boot.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Repeated faults demoted to debug since boot.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// `true` when this occurrence should warn; otherwise counts it.
    fn first_of(flag: &mut bool, suppressed: &mut u64) -> bool {
        if *flag {
            *suppressed += 1;
            false
        } else {
            *flag = true;
            true
        }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted += 1;
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::Armed {
                threshold_grams,
                threshold_updated,
            } => {
                info!(
                    "CMD   | arm | threshold={}g{}",
                    threshold_grams,
                    if *threshold_updated { " (updated)" } else { "" }
                );
            }
            AppEvent::Disarmed { at_ms } => {
                info!("CMD   | disarm | cooldown from t={}ms", at_ms);
            }
            AppEvent::AlarmRaised {
                weight_grams,
                threshold_grams,
            } => {
                warn!(
                    "ALARM | weight={:.1}g < threshold={}g",
                    weight_grams, threshold_grams
                );
            }
            AppEvent::PayloadRejected(why) => {
                warn!("CMD   | arm payload rejected: {}", why);
            }
            AppEvent::SensorNotReady(why) => {
                if Self::first_of(&mut self.sensor_down, &mut self.suppressed) {
                    warn!("SENSE | no sample: {}", why);
                } else {
                    debug!("SENSE | still no sample: {}", why);
                }
            }
            AppEvent::SensorRestored => {
                self.sensor_down = false;
                info!("SENSE | sampling again");
            }
            AppEvent::TransportUnavailable => {
                error!("NET   | MQTT unavailable");
            }
            AppEvent::TransportRestored => {
                self.publish_down = false;
                info!("NET   | MQTT connected");
            }
            AppEvent::PublishFailed(why) => {
                if Self::first_of(&mut self.publish_down, &mut self.suppressed) {
                    warn!("NET   | publish dropped: {}", why);
                } else {
                    debug!("NET   | publish dropped again: {}", why);
                }
            }
        }
    }
}
