//! Fuzz target: inbound MQTT message handling
//!
//! Splits the input into a topic and a payload, runs them through the
//! command decoder and the inbox, and checks that an accepted threshold is
//! always positive and that a rejected arm payload never moves it.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use mailwatch::app::commands::{decode, parse_threshold, Command, Decoded};
use mailwatch::inbox::Inbox;
use mailwatch::topics::Topics;

fuzz_target!(|data: &[u8]| {
    let Ok(topics) = Topics::new("fuzz") else {
        return;
    };

    // First byte picks the topic, the rest is the payload.
    let (selector, payload) = match data.split_first() {
        Some((s, rest)) => (*s, rest),
        None => (0, data),
    };
    let topic = match selector % 3 {
        0 => topics.arm(),
        1 => topics.disarm(),
        _ => topics.weight(),
    };

    match decode(&topics, topic, payload) {
        Decoded::Command(Command::Arm(Some(v))) => assert!(v > 0, "accepted non-positive {v}"),
        Decoded::Command(Command::Arm(None)) => panic!("arm without threshold must be degraded"),
        Decoded::Degraded(cmd, why) => {
            assert_eq!(cmd, Command::Arm(None), "degraded must keep the threshold");
            assert_eq!(parse_threshold(payload), Err(why));
        }
        Decoded::Command(Command::Disarm) => assert_eq!(selector % 3, 1),
        Decoded::Unrecognized => assert_eq!(selector % 3, 2),
    }

    // Whatever reaches the inbox comes back out byte-identical.
    let inbox = Inbox::new();
    if inbox.push(topic, payload).is_ok() {
        let mut seen = 0;
        inbox.drain(&mut |t: &str, p: &[u8]| {
            assert_eq!(t, topic);
            assert_eq!(p, payload);
            seen += 1;
        });
        assert_eq!(seen, 1);
    }
});
