//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to                |
//! |-------------|-----------------------|----------------------------|
//! | `log_sink`  | EventSink             | Serial log output          |
//! | `mqtt`      | MessagingPort         | ESP-IDF MQTT client        |
//! | `time`      | ClockPort, DelayPort  | ESP32 system timer         |
//! | `wifi`      | -                     | ESP-IDF WiFi STA (boot)    |
//! | `device_id` | -                     | Factory MAC (eFuse)        |
//!
//! The load cell and buzzer drivers implement their ports directly; see
//! [`sensors`](crate::sensors) and [`drivers`](crate::drivers).

pub mod device_id;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
