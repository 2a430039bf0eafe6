//! Peripheral capabilities and the registry that owns them.
//!
//! The registry is populated once at boot and lives for the process
//! lifetime.  Components never own peripherals: they remember the ids and
//! resolve them through the registry on every access.

use log::info;

use crate::error::PeripheralError;

/// Events produced by a debounced input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The input level changed.
    Change,
    /// Press and release shorter than the short-press threshold.
    Single,
    /// Two single presses within the double-press window.
    Double,
    /// Held for at least the long-press threshold.
    Long,
}

/// Events produced by one input poll.
pub type InputEvents = heapless::Vec<InputEvent, 4>;

/// A digital input (switch terminal or physical button).
pub trait Input {
    fn id(&self) -> i32;

    /// Current debounced level: `true` = active.
    fn state(&self) -> bool;

    /// Sample the hardware and return any events detected since the last
    /// poll.  Inputs driven elsewhere (e.g. by ISR) may return nothing.
    fn poll(&mut self, _now_ms: u64) -> InputEvents {
        InputEvents::new()
    }
}

/// A controllable output (relay).
pub trait Output {
    fn id(&self) -> i32;

    /// Current commanded state: `true` = energised.
    fn state(&self) -> bool;

    /// Drive the output.  `source` is a short diagnostic tag ("btn", "OVH", ...).
    fn set_state(&mut self, on: bool, source: &str) -> Result<(), PeripheralError>;
}

/// A power meter attached to an output channel.
pub trait PowerMeter {
    fn id(&self) -> i32;

    /// Instantaneous active power (watts), from the meter's last sample.
    fn power_w(&self) -> Result<f32, PeripheralError>;

    /// Accumulated energy since boot (watt-hours).
    fn energy_wh(&self) -> Result<f32, PeripheralError>;
}

/// A temperature sensor.
pub trait TempSensor {
    /// Current temperature (Celsius).
    fn temperature_c(&mut self) -> Result<f32, PeripheralError>;
}

/// Owns every configured peripheral; lookup by stable integer id.
#[derive(Default)]
pub struct PeripheralRegistry {
    inputs: Vec<Box<dyn Input>>,
    outputs: Vec<Box<dyn Output>>,
    power_meters: Vec<Box<dyn PowerMeter>>,
    sys_temp: Option<Box<dyn TempSensor>>,
}

impl PeripheralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, input: Box<dyn Input>) {
        info!("Registry: input {}", input.id());
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, output: Box<dyn Output>) {
        info!("Registry: output {}", output.id());
        self.outputs.push(output);
    }

    pub fn add_power_meter(&mut self, pm: Box<dyn PowerMeter>) {
        info!("Registry: power meter {}", pm.id());
        self.power_meters.push(pm);
    }

    pub fn set_system_temp_sensor(&mut self, sensor: Box<dyn TempSensor>) {
        self.sys_temp = Some(sensor);
    }

    // ── Lookup ───────────────────────────────────────────────

    pub fn input(&self, id: i32) -> Option<&dyn Input> {
        self.inputs.iter().find(|i| i.id() == id).map(AsRef::as_ref)
    }

    pub fn output(&self, id: i32) -> Option<&dyn Output> {
        self.outputs.iter().find(|o| o.id() == id).map(AsRef::as_ref)
    }

    pub fn output_mut(&mut self, id: i32) -> Option<&mut (dyn Output + 'static)> {
        self.outputs.iter_mut().find(|o| o.id() == id).map(AsMut::as_mut)
    }

    pub fn power_meter(&self, id: i32) -> Option<&dyn PowerMeter> {
        self.power_meters.iter().find(|p| p.id() == id).map(AsRef::as_ref)
    }

    pub fn has_input(&self, id: i32) -> bool {
        self.input(id).is_some()
    }

    pub fn has_output(&self, id: i32) -> bool {
        self.output(id).is_some()
    }

    pub fn has_power_meter(&self, id: i32) -> bool {
        self.power_meter(id).is_some()
    }

    pub fn has_system_temp_sensor(&self) -> bool {
        self.sys_temp.is_some()
    }

    /// Read the system temperature sensor.  `None` when not configured.
    pub fn read_system_temperature(&mut self) -> Option<Result<f32, PeripheralError>> {
        self.sys_temp.as_mut().map(|s| s.temperature_c())
    }

    // ── Bulk operations ──────────────────────────────────────

    /// Drive every output to `on` with the given diagnostic tag.
    /// Returns the number of outputs that failed.
    pub fn set_all_outputs(&mut self, on: bool, source: &str) -> usize {
        let mut failed = 0;
        for out in &mut self.outputs {
            if let Err(e) = out.set_state(on, source) {
                log::warn!("Output {}: set failed: {}", out.id(), e);
                failed += 1;
            }
        }
        failed
    }

    /// Poll every input and collect `(id, level, event)` triples.
    pub fn poll_inputs(&mut self, now_ms: u64) -> Vec<(i32, bool, InputEvent)> {
        let mut events = Vec::new();
        for input in &mut self.inputs {
            let polled = input.poll(now_ms);
            let level = input.state();
            events.extend(polled.into_iter().map(|ev| (input.id(), level, ev)));
        }
        events
    }

    pub fn output_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.outputs.iter().map(|o| o.id())
    }
}
