//! Sensors read through the [`TempSensor`](crate::peripherals::TempSensor) capability.

pub mod temperature;
