//! Device state threaded through every FSM handler.
//!
//! `DeviceState` is the one mutable domain value in the firmware.  It
//! holds the threshold, the disarm timestamp, the sample under evaluation
//! and the output requests the handlers raise.  Whether the device is
//! armed or latched is not stored here: that is the FSM's current state.

/// One averaged load-cell reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    pub grams: f32,
}

impl WeightSample {
    pub fn new(grams: f32) -> Self {
        Self { grams }
    }

    pub fn is_below(&self, threshold_grams: i32) -> bool {
        self.grams < threshold_grams as f32
    }

    /// Whole grams, truncated toward zero.
    pub fn whole_grams(&self) -> i32 {
        self.grams as i32
    }
}

// ---------------------------------------------------------------------------
// Output requests (written by state handlers; consumed by AppService)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmOutputs {
    /// Desired buzzer level.
    pub buzzer_on: bool,
    /// An alarm publish is owed.  Set once on latch, taken once.
    pub alarm_pending: bool,
}

// ---------------------------------------------------------------------------
// DeviceState
// ---------------------------------------------------------------------------

pub struct DeviceState {
    // -- Timing --
    /// Monotonic time of the current step (ms since boot).
    pub now_ms: u64,
    /// Time of the most recent disarm, or of boot.
    pub last_disarm_ms: u64,
    /// Quiet period after a disarm.
    pub cooldown_ms: u64,

    // -- Alarm --
    /// Always strictly positive.
    pub threshold_grams: i32,

    // -- Sample --
    /// Sample for this tick, `None` when the sensor had nothing.
    pub sample: Option<WeightSample>,

    // -- Outputs --
    pub outputs: AlarmOutputs,
}

impl DeviceState {
    pub fn new(threshold_grams: i32, cooldown_ms: u64) -> Self {
        Self {
            now_ms: 0,
            last_disarm_ms: 0,
            cooldown_ms,
            threshold_grams,
            sample: None,
            outputs: AlarmOutputs::default(),
        }
    }

    /// Strictly more than `cooldown_ms` has passed since the last disarm.
    pub fn cooldown_elapsed(&self) -> bool {
        self.now_ms.saturating_sub(self.last_disarm_ms) > self.cooldown_ms
    }

    /// Take the pending alarm publish, if any.
    pub fn take_alarm(&mut self) -> bool {
        core::mem::take(&mut self.outputs.alarm_pending)
    }
}
