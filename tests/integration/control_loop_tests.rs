//! Integration tests for [`ControlLoop`]: connectivity, inbox drain,
//! sampling, alarm publish and the per-cycle weight report, all against
//! mock adapters on a manual clock.

use super::mock_hw::{ManualClock, ManualDelay, MockBroker, MockBuzzer, ScriptedSensor, VecSink};

use mailwatch::app::events::AppEvent;
use mailwatch::app::ports::{BrokerCredentials, ClockPort};
use mailwatch::app::service::{AppService, Evaluation};
use mailwatch::config::{BootState, DeviceConfig, PayloadFormat};
use mailwatch::control::{ControlLoop, LoopSettings, Ports};
use mailwatch::error::{SensorError, TransportError};
use mailwatch::fsm::StateId;
use mailwatch::topics::Topics;

type TestLoop =
    ControlLoop<ScriptedSensor, MockBroker, MockBuzzer, ManualClock, ManualDelay, VecSink>;

const COOLDOWN: u64 = 300_000;
const BACKOFF: u32 = 5_000;
const ARM: &str = "mailbox/sensor_id/arm_alarm";
const DISARM: &str = "mailbox/sensor_id/disarm_alarm";
const WEIGHT: &str = "mailbox/sensor_id/weight";
const ALARM: &str = "mailbox/sensor_id/alarm";

fn make_loop(config: DeviceConfig, broker: MockBroker) -> (TestLoop, ManualClock) {
    let clock = ManualClock::at(0);
    let topics = Topics::new("sensor_id").unwrap();
    let app = AppService::new(&config, topics);
    let ports = Ports {
        sensor: ScriptedSensor::new(),
        mqtt: broker,
        buzzer: MockBuzzer::default(),
        clock: clock.clone(),
        delay: clock.delay(),
        sink: VecSink::default(),
    };
    let credentials = BrokerCredentials::from_config(&config, "mailwatch-test".into());
    let mut control = ControlLoop::new(app, ports, LoopSettings::from_config(&config), credentials);
    control.start();
    (control, clock)
}

fn default_loop() -> (TestLoop, ManualClock) {
    make_loop(DeviceConfig::default(), MockBroker::new())
}

// ── Connectivity ──────────────────────────────────────────────

#[test]
fn first_cycle_connects_and_subscribes_to_both_command_topics() {
    let (mut control, _clock) = default_loop();

    let report = control.run_cycle();

    assert!(report.connected);
    assert!(report.reconnected);
    let broker = &control.ports().mqtt;
    assert_eq!(broker.connect_calls, 1);
    assert_eq!(broker.subscriptions, vec![DISARM, ARM]);
    assert_eq!(
        broker.last_credentials.as_ref().map(|c| c.client_id.as_str()),
        Some("mailwatch-test")
    );
}

#[test]
fn connected_cycle_does_not_reconnect() {
    let (mut control, _clock) = default_loop();
    control.run_cycle();

    let report = control.run_cycle();

    assert!(report.connected);
    assert!(!report.reconnected);
    assert_eq!(report.link_error, None);
    assert_eq!(control.ports().mqtt.connect_calls, 1);
    assert_eq!(control.ports().mqtt.subscriptions.len(), 2);
}

#[test]
fn unreachable_broker_stalls_at_most_two_backoffs() {
    let (mut control, clock) = make_loop(DeviceConfig::default(), MockBroker::unreachable());

    let report = control.run_cycle();

    assert!(!report.connected);
    assert_eq!(report.link_error, Some(TransportError::Unavailable));
    assert!(!report.weight_published);
    assert_eq!(control.ports().mqtt.connect_calls, 3);
    assert_eq!(control.ports().delay.slept, vec![BACKOFF, BACKOFF]);
    assert_eq!(report.elapsed_ms, 2 * u64::from(BACKOFF));
    assert_eq!(clock.now_ms(), 2 * u64::from(BACKOFF));

    let sink = &control.ports().sink;
    assert_eq!(sink.count(|e| *e == AppEvent::TransportUnavailable), 1);
    assert!(sink
        .events
        .contains(&AppEvent::PublishFailed(TransportError::NotConnected)));
}

#[test]
fn refused_connect_recovers_after_one_backoff() {
    let mut broker = MockBroker::new();
    broker.refuse_connects = 1;
    let (mut control, _clock) = make_loop(DeviceConfig::default(), broker);

    let report = control.run_cycle();

    assert!(report.connected);
    assert!(report.reconnected);
    assert_eq!(control.ports().delay.slept, vec![BACKOFF]);
    assert_eq!(
        control
            .ports()
            .sink
            .count(|e| *e == AppEvent::TransportRestored),
        1
    );
}

#[test]
fn dropped_session_is_resubscribed() {
    let (mut control, _clock) = default_loop();
    control.run_cycle();

    control.ports_mut().mqtt.drop_session();
    let report = control.run_cycle();

    assert!(report.reconnected);
    let broker = &control.ports().mqtt;
    assert_eq!(broker.connect_calls, 2);
    assert_eq!(broker.subscriptions, vec![DISARM, ARM, DISARM, ARM]);
}

#[test]
fn loop_keeps_sampling_while_broker_is_down() {
    let (mut control, clock) = make_loop(DeviceConfig::default(), MockBroker::unreachable());
    control.ports_mut().sensor.push(80.0);

    let report = control.run_cycle();

    assert_eq!(report.sample.map(|s| s.grams), Some(80.0));
    assert_eq!(report.weight_grams, 80);

    control.ports_mut().mqtt.reachable = true;
    clock.advance(1_000);
    control.ports_mut().sensor.push(81.0);
    let report = control.run_cycle();

    assert!(report.connected);
    assert_eq!(control.ports().mqtt.published_on(WEIGHT), vec!["81"]);
}

// ── Weight reporting ──────────────────────────────────────────

#[test]
fn weight_is_published_every_cycle_with_fallbacks() {
    let (mut control, _clock) = default_loop();
    control.ports_mut().sensor = ScriptedSensor::with(&[None, Some(123.7), None, Some(-2.5)]);

    let reports: Vec<_> = (0..4).map(|_| control.run_cycle()).collect();

    assert!(reports.iter().all(|r| r.weight_published));
    assert_eq!(
        control.ports().mqtt.published_on(WEIGHT),
        vec!["0", "123", "123", "-2"]
    );
    assert_eq!(
        control
            .ports()
            .sink
            .count(|e| *e == AppEvent::SensorNotReady(SensorError::NotReady)),
        2
    );
}

#[test]
fn sensor_recovery_is_reported_once_per_outage() {
    let (mut control, _clock) = default_loop();
    control.ports_mut().sensor =
        ScriptedSensor::with(&[None, None, None, Some(50.0), Some(51.0), None, Some(52.0)]);

    for _ in 0..7 {
        control.run_cycle();
    }

    let sink = &control.ports().sink;
    assert_eq!(sink.count(|e| matches!(e, AppEvent::SensorNotReady(_))), 4);
    assert_eq!(sink.count(|e| *e == AppEvent::SensorRestored), 2);
}

#[test]
fn json_format_wraps_outbound_values() {
    let config = DeviceConfig {
        payload_format: PayloadFormat::Json,
        ..DeviceConfig::default()
    };
    let (mut control, _clock) = make_loop(config, MockBroker::new());
    control.ports_mut().sensor.push(42.9);

    control.run_cycle();

    assert_eq!(
        control.ports().mqtt.published_on(WEIGHT),
        vec![r#"{"value":42}"#]
    );
}

#[test]
fn non_finite_reading_is_not_a_sample() {
    let (mut control, _clock) = default_loop();
    control.ports_mut().sensor.push(f32::NAN);

    let report = control.run_cycle();

    assert_eq!(report.sample, None);
    assert_eq!(report.weight_grams, 0);
    assert!(control
        .ports()
        .sink
        .events
        .contains(&AppEvent::SensorNotReady(SensorError::PinFault)));
}

// ── Alarm flow end to end ─────────────────────────────────────

#[test]
fn arm_150_then_light_mailbox_publishes_one_alarm() {
    let (mut control, clock) = default_loop();
    control.ports_mut().mqtt.deliver(ARM, "150");
    control.ports_mut().sensor.push(100.0);

    // Inside the boot cooldown.
    let report = control.run_cycle();
    assert_eq!(report.messages, 1);
    assert_eq!(report.evaluation, Evaluation::Quiet);
    assert_eq!(control.app().status().threshold_grams, 150);
    assert!(control.ports().mqtt.published_on(ALARM).is_empty());

    clock.advance(COOLDOWN + 1);
    for _ in 0..5 {
        control.ports_mut().sensor.push(100.0);
    }
    let reports: Vec<_> = (0..5).map(|_| control.run_cycle()).collect();

    assert!(reports[0].alarm_published);
    assert!(reports[1..].iter().all(|r| !r.alarm_published));
    assert_eq!(control.ports().mqtt.published_on(ALARM), vec!["1"]);
    assert!(control.ports().buzzer.is_on_now());
    assert!(control.app().status().alarm_latched);
    assert_eq!(control.app().state(), StateId::Latched);
}

#[test]
fn disarm_over_mqtt_silences_and_resets_cooldown() {
    let (mut control, clock) = default_loop();
    control.ports_mut().mqtt.deliver(ARM, "150");
    control.run_cycle();
    clock.advance(COOLDOWN + 1);
    control.ports_mut().sensor.push(100.0);
    control.run_cycle();
    assert!(control.ports().buzzer.is_on_now());

    clock.advance(1_000);
    let t_disarm = clock.now_ms();
    control.ports_mut().mqtt.deliver(DISARM, "");
    control.run_cycle();

    let status = control.app().status();
    assert!(!status.alarm_latched);
    assert!(!status.armed);
    assert_eq!(status.last_disarm_ms, t_disarm);
    assert!(!control.ports().buzzer.is_on_now());
}

#[test]
fn heavy_mailbox_never_alarms() {
    let (mut control, clock) = default_loop();
    control.ports_mut().mqtt.deliver(ARM, "150");
    control.run_cycle();
    clock.advance(COOLDOWN + 1);
    control.ports_mut().sensor.push(250.0);

    let report = control.run_cycle();

    assert_eq!(report.evaluation, Evaluation::Quiet);
    assert_eq!(control.app().state(), StateId::Watching);
    assert!(control.ports().mqtt.published_on(ALARM).is_empty());
    assert_eq!(control.ports().mqtt.published_on(WEIGHT), vec!["0", "250"]);
}

#[test]
fn alarm_lost_to_outage_is_not_republished() {
    let config = DeviceConfig {
        boot_state: BootState::Armed,
        ..DeviceConfig::default()
    };
    let (mut control, clock) = make_loop(config, MockBroker::unreachable());
    clock.advance(COOLDOWN + 1);
    control.ports_mut().sensor.push(10.0);

    let report = control.run_cycle();
    assert!(matches!(report.evaluation, Evaluation::AlarmRaised(_)));
    assert!(!report.alarm_published);
    assert_eq!(control.app().state(), StateId::Latched);

    control.ports_mut().mqtt.reachable = true;
    control.ports_mut().sensor.push(10.0);
    let report = control.run_cycle();

    assert!(report.connected);
    assert!(!report.alarm_published);
    assert!(control.ports().mqtt.published_on(ALARM).is_empty());
    assert!(control.ports().buzzer.is_on_now());
}

#[test]
fn cycle_counter_advances() {
    let (mut control, _clock) = default_loop();
    for _ in 0..3 {
        control.run_cycle();
    }
    assert_eq!(control.cycles(), 3);
}
