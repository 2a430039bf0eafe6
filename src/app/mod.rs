//! Application core: orchestration logic, zero direct I/O.
//!
//! Accessory-server lifecycle, status-LED arbitration, button gestures and
//! the thermal interlock meet here.  All interaction with hardware and the
//! protocol engine happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod button;
pub mod commands;
pub mod events;
pub mod indicator;
pub mod lifecycle;
pub mod ports;
pub mod service;
