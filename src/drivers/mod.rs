//! GPIO drivers behind the `embedded-hal` digital traits.

pub mod input_pin;
pub mod output_pin;
pub mod status_led;
