//! Concrete state handler functions and table builder.
//!
//! ```text
//!                 arm                      sample < threshold
//!  DISARMED ──────────────▶ WATCHING ──── && cooldown over ────▶ LATCHED
//!     ▲  ▲                   │   ▲                                 │
//!     │  └──── disarm ───────┘   └──────────── arm ────────────────┤
//!     └──────────────────────────── disarm ────────────────────────┘
//! ```
//!
//! Only `Watching` looks at samples.  Arm and disarm arrive as commands
//! and are applied with `force_transition` by the service.

use super::context::DeviceState;
use super::{StateDescriptor, StateId};
use log::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Disarmed
        StateDescriptor {
            id: StateId::Disarmed,
            name: "Disarmed",
            on_enter: Some(disarmed_enter),
            on_exit: None,
            on_update: disarmed_update,
        },
        // Index 1: Watching
        StateDescriptor {
            id: StateId::Watching,
            name: "Watching",
            on_enter: Some(watching_enter),
            on_exit: None,
            on_update: watching_update,
        },
        // Index 2: Latched
        StateDescriptor {
            id: StateId::Latched,
            name: "Latched",
            on_enter: Some(latched_enter),
            on_exit: Some(latched_exit),
            on_update: latched_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISARMED
// ═══════════════════════════════════════════════════════════════════════════

fn disarmed_enter(st: &mut DeviceState) {
    st.outputs.buzzer_on = false;
    st.outputs.alarm_pending = false;
    info!("DISARMED: alarm evaluation off");
}

fn disarmed_update(_st: &mut DeviceState) -> Option<StateId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  WATCHING: armed, comparing samples against the threshold
// ═══════════════════════════════════════════════════════════════════════════

fn watching_enter(st: &mut DeviceState) {
    st.outputs.buzzer_on = false;
    info!(
        "WATCHING: threshold {} g, cooldown {} ms from t={}",
        st.threshold_grams, st.cooldown_ms, st.last_disarm_ms
    );
}

fn watching_update(st: &mut DeviceState) -> Option<StateId> {
    let sample = st.sample?;

    if !sample.is_below(st.threshold_grams) {
        return None;
    }

    if !st.cooldown_elapsed() {
        debug!(
            "WATCHING: {:.1} g below {} g but cooldown active ({} ms since disarm)",
            sample.grams,
            st.threshold_grams,
            st.now_ms.saturating_sub(st.last_disarm_ms)
        );
        return None;
    }

    Some(StateId::Latched)
}

// ═══════════════════════════════════════════════════════════════════════════
//  LATCHED: alarm fired, suppressed until the next arm or disarm
// ═══════════════════════════════════════════════════════════════════════════

fn latched_enter(st: &mut DeviceState) {
    st.outputs.buzzer_on = true;
    st.outputs.alarm_pending = true;
    warn!(
        "LATCHED: weight {:.1} g below threshold {} g",
        st.sample.map_or(f32::NAN, |s| s.grams),
        st.threshold_grams
    );
}

fn latched_exit(st: &mut DeviceState) {
    st.outputs.buzzer_on = false;
    st.outputs.alarm_pending = false;
    info!("LATCHED: latch cleared");
}

fn latched_update(_st: &mut DeviceState) -> Option<StateId> {
    None
}
