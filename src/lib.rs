//! Mailwatch firmware library.
//!
//! Exposes the pure-logic modules for integration testing and the
//! adapters the device binary wires together.  All ESP-IDF-specific code
//! is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod inbox;
pub mod topics;

pub mod adapters;
pub mod drivers;
pub mod sensors;

mod esp_link_shims;
