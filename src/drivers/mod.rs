//! Actuator drivers.

pub mod buzzer;
