//! Integration tests for the message → decode → FSM → buzzer pipeline.
//!
//! Drives [`AppService`] directly with raw MQTT topics and payloads and
//! explicit timestamps, so every cooldown boundary is exact.

use super::mock_hw::{MockBuzzer, VecSink};

use mailwatch::app::events::AppEvent;
use mailwatch::app::service::{AppService, Evaluation};
use mailwatch::config::{BootState, DeviceConfig};
use mailwatch::error::PayloadError;
use mailwatch::fsm::context::WeightSample;
use mailwatch::fsm::StateId;
use mailwatch::topics::Topics;

const COOLDOWN: u64 = 300_000;
const ARM: &str = "mailbox/sensor_id/arm_alarm";
const DISARM: &str = "mailbox/sensor_id/disarm_alarm";

fn make_app(config: DeviceConfig) -> (AppService, MockBuzzer, VecSink) {
    let topics = Topics::new("sensor_id").unwrap();
    let mut app = AppService::new(&config, topics);
    let mut buzzer = MockBuzzer::default();
    let mut sink = VecSink::default();
    app.start(0, &mut buzzer, &mut sink);
    (app, buzzer, sink)
}

fn booted() -> (AppService, MockBuzzer, VecSink) {
    make_app(DeviceConfig::default())
}

fn grams(g: f32) -> Option<WeightSample> {
    Some(WeightSample::new(g))
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boots_disarmed_with_default_threshold() {
    let (app, buzzer, sink) = booted();

    assert_eq!(app.state(), StateId::Disarmed);
    let status = app.status();
    assert!(!status.armed);
    assert!(!status.alarm_latched);
    assert_eq!(status.threshold_grams, 200);
    assert_eq!(status.last_disarm_ms, 0);
    assert!(!buzzer.is_on_now());
    assert_eq!(sink.events, vec![AppEvent::Started(StateId::Disarmed)]);
}

#[test]
fn never_evaluates_before_first_arm() {
    let (mut app, mut buzzer, mut sink) = booted();

    // Well past the cooldown and far below threshold.
    let eval = app.evaluate(grams(0.0), COOLDOWN * 10, &mut buzzer, &mut sink);

    assert_eq!(eval, Evaluation::NotEvaluated);
    assert_eq!(app.state(), StateId::Disarmed);
    assert!(!buzzer.is_on_now());
}

#[test]
fn armed_boot_watches_but_honours_boot_cooldown() {
    let config = DeviceConfig {
        boot_state: BootState::Armed,
        ..DeviceConfig::default()
    };
    let (mut app, mut buzzer, mut sink) = make_app(config);

    assert_eq!(app.state(), StateId::Watching);
    assert!(sink.events.contains(&AppEvent::Armed {
        threshold_grams: 200,
        threshold_updated: false,
    }));

    let eval = app.evaluate(grams(10.0), COOLDOWN, &mut buzzer, &mut sink);
    assert_eq!(eval, Evaluation::Quiet);

    let eval = app.evaluate(grams(10.0), COOLDOWN + 1, &mut buzzer, &mut sink);
    assert!(matches!(eval, Evaluation::AlarmRaised(_)));
}

// ── Arm "150" → cooldown → 100 g → latched ────────────────────

#[test]
fn arm_150_then_light_sample_after_cooldown_latches() {
    let (mut app, mut buzzer, mut sink) = booted();

    app.handle_message(ARM, b"150", 1_000, &mut buzzer, &mut sink);
    assert_eq!(app.state(), StateId::Watching);
    assert_eq!(app.status().threshold_grams, 150);

    // Inside the cooldown window: quiet.
    let eval = app.evaluate(grams(100.0), 2_000, &mut buzzer, &mut sink);
    assert_eq!(eval, Evaluation::Quiet);
    assert!(!buzzer.is_on_now());

    let eval = app.evaluate(grams(100.0), COOLDOWN + 1, &mut buzzer, &mut sink);
    assert_eq!(eval, Evaluation::AlarmRaised(WeightSample::new(100.0)));
    assert_eq!(app.state(), StateId::Latched);
    assert!(app.status().alarm_latched);
    assert!(buzzer.is_on_now());
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::AlarmRaised { .. })),
        1
    );
}

#[test]
fn then_disarm_clears_latch_resets_cooldown_and_silences() {
    let (mut app, mut buzzer, mut sink) = booted();
    app.handle_message(ARM, b"150", 1_000, &mut buzzer, &mut sink);
    app.evaluate(grams(100.0), COOLDOWN + 1, &mut buzzer, &mut sink);
    assert!(buzzer.is_on_now());

    let t_disarm = COOLDOWN + 5_000;
    app.handle_message(DISARM, b"", t_disarm, &mut buzzer, &mut sink);

    let status = app.status();
    assert_eq!(app.state(), StateId::Disarmed);
    assert!(!status.alarm_latched);
    assert!(!status.armed);
    assert_eq!(status.last_disarm_ms, t_disarm);
    assert!(!buzzer.is_on_now());
    assert!(sink.events.contains(&AppEvent::Disarmed { at_ms: t_disarm }));
}

#[test]
fn rearm_after_disarm_waits_for_new_cooldown() {
    let (mut app, mut buzzer, mut sink) = booted();
    app.handle_message(ARM, b"150", 0, &mut buzzer, &mut sink);
    app.evaluate(grams(100.0), COOLDOWN + 1, &mut buzzer, &mut sink);

    let t_disarm = 400_000;
    app.handle_message(DISARM, b"", t_disarm, &mut buzzer, &mut sink);
    app.handle_message(ARM, b"", t_disarm + 10, &mut buzzer, &mut sink);
    assert_eq!(app.status().threshold_grams, 150);

    let eval = app.evaluate(grams(100.0), t_disarm + COOLDOWN, &mut buzzer, &mut sink);
    assert_eq!(eval, Evaluation::Quiet);

    let eval = app.evaluate(grams(100.0), t_disarm + COOLDOWN + 1, &mut buzzer, &mut sink);
    assert!(matches!(eval, Evaluation::AlarmRaised(_)));
}

#[test]
fn disarm_while_disarmed_still_resets_cooldown() {
    let (mut app, mut buzzer, mut sink) = booted();

    app.handle_message(DISARM, b"anything", 50_000, &mut buzzer, &mut sink);

    assert_eq!(app.state(), StateId::Disarmed);
    assert_eq!(app.status().last_disarm_ms, 50_000);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::StateChanged { .. })),
        0
    );
}

// ── Bad thresholds ────────────────────────────────────────────

#[test]
fn arm_minus_five_keeps_threshold_and_rearms() {
    let (mut app, mut buzzer, mut sink) = booted();

    app.handle_message(ARM, b"-5", 1_000, &mut buzzer, &mut sink);

    assert_eq!(app.state(), StateId::Watching);
    assert_eq!(app.status().threshold_grams, 200);
    assert!(sink
        .events
        .contains(&AppEvent::PayloadRejected(PayloadError::NonPositive)));
    assert!(sink.events.contains(&AppEvent::Armed {
        threshold_grams: 200,
        threshold_updated: false,
    }));
    // Disarmed → Watching and nothing more.
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::StateChanged { .. })),
        1
    );
}

#[test]
fn empty_arm_payload_rearms_and_reports() {
    let (mut app, mut buzzer, mut sink) = booted();

    app.handle_message(ARM, b"", 1_000, &mut buzzer, &mut sink);

    assert!(app.status().armed);
    assert_eq!(app.status().threshold_grams, 200);
    assert!(sink
        .events
        .contains(&AppEvent::PayloadRejected(PayloadError::Empty)));
    assert!(sink.events.contains(&AppEvent::Armed {
        threshold_grams: 200,
        threshold_updated: false,
    }));
}

#[test]
fn unparsable_thresholds_leave_value_alone() {
    let (mut app, mut buzzer, mut sink) = booted();
    app.handle_message(ARM, b"175", 0, &mut buzzer, &mut sink);

    for bad in [&b"abc"[..], b"0", b"12.5", b"99999999999", b"{\"value\":\"x\"}", b"\xff\xfe"] {
        app.handle_message(ARM, bad, 10, &mut buzzer, &mut sink);
        assert_eq!(app.status().threshold_grams, 175, "payload {bad:?}");
        assert_eq!(app.state(), StateId::Watching);
    }
}

#[test]
fn json_arm_payload_sets_threshold() {
    let (mut app, mut buzzer, mut sink) = booted();

    app.handle_message(ARM, br#"{"value": 320}"#, 0, &mut buzzer, &mut sink);

    assert_eq!(app.status().threshold_grams, 320);
    assert!(sink.events.contains(&AppEvent::Armed {
        threshold_grams: 320,
        threshold_updated: true,
    }));
}

// ── Heavy sample / foreign topics ─────────────────────────────

#[test]
fn heavy_sample_while_armed_stays_watching() {
    let (mut app, mut buzzer, mut sink) = booted();
    app.handle_message(ARM, b"150", 0, &mut buzzer, &mut sink);

    let eval = app.evaluate(grams(250.0), COOLDOWN * 2, &mut buzzer, &mut sink);

    assert_eq!(eval, Evaluation::Quiet);
    assert_eq!(app.state(), StateId::Watching);
    assert!(!app.status().alarm_latched);
    assert!(!buzzer.is_on_now());
}

#[test]
fn messages_on_other_topics_are_ignored() {
    let (mut app, mut buzzer, mut sink) = booted();
    sink.clear();

    app.handle_message("mailbox/other/arm_alarm", b"150", 0, &mut buzzer, &mut sink);
    app.handle_message("mailbox/sensor_id/weight", b"150", 0, &mut buzzer, &mut sink);

    assert_eq!(app.state(), StateId::Disarmed);
    assert!(sink.events.is_empty());
}

// ── Latch behaviour ───────────────────────────────────────────

#[test]
fn latched_alarm_fires_once_for_many_light_samples() {
    let (mut app, mut buzzer, mut sink) = booted();
    app.handle_message(ARM, b"150", 0, &mut buzzer, &mut sink);

    let raised = (1..=20)
        .map(|i| app.evaluate(grams(90.0), COOLDOWN + i, &mut buzzer, &mut sink))
        .filter(|e| matches!(e, Evaluation::AlarmRaised(_)))
        .count();

    assert_eq!(raised, 1);
    assert_eq!(app.state(), StateId::Latched);
    // Turned on once, never toggled while latched.
    assert_eq!(buzzer.writes, 1);
}

#[test]
fn arm_while_latched_clears_latch_and_can_fire_again() {
    let (mut app, mut buzzer, mut sink) = booted();
    app.handle_message(ARM, b"150", 0, &mut buzzer, &mut sink);
    app.evaluate(grams(90.0), COOLDOWN + 1, &mut buzzer, &mut sink);
    assert!(app.status().alarm_latched);

    app.handle_message(ARM, b"", COOLDOWN + 2, &mut buzzer, &mut sink);
    assert_eq!(app.state(), StateId::Watching);
    assert!(!buzzer.is_on_now());

    // Arm does not reset the cooldown clock.
    let eval = app.evaluate(grams(90.0), COOLDOWN + 3, &mut buzzer, &mut sink);
    assert!(matches!(eval, Evaluation::AlarmRaised(_)));
}

#[test]
fn missing_sample_is_never_evaluated() {
    let (mut app, mut buzzer, mut sink) = booted();
    app.handle_message(ARM, b"150", 0, &mut buzzer, &mut sink);

    let eval = app.evaluate(None, COOLDOWN * 3, &mut buzzer, &mut sink);

    assert_eq!(eval, Evaluation::NotEvaluated);
    assert_eq!(app.state(), StateId::Watching);
}
