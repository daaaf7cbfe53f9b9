//! Sensor drivers.
//!
//! Only one sensor on this board: the HX711 load cell under the mailbox
//! floor, exposed to the domain through
//! [`WeightSensorPort`](crate::app::ports::WeightSensorPort).

pub mod load_cell;
