//! Components and their behaviour table.
//!
//! A single [`Component`] type covers every variant.  Behaviour is selected
//! by [`ComponentKind`] through a static table of function pointers:
//!
//! ```text
//! ┌──────────────────┬────────┬───────────┬───────────┬────────┬──────────┐
//! │ ComponentKind    │ init   │ get_state │ set_state │ info   │ on_input │
//! ├──────────────────┼────────┼───────────┼───────────┼────────┼──────────┤
//! │ Switch           │ output │ output    │ output    │ st/pw  │ in_mode  │
//! │ Outlet           │ output │ output    │ output    │ st/pw  │ in_mode  │
//! │ Lock             │ output │ output    │ output    │ lock   │ in_mode  │
//! │ StatelessSwitch  │ input  │ -         │ -         │ last   │ press    │
//! │ HiddenSwitch     │ output │ output    │ output    │ st/pw  │ in_mode  │
//! └──────────────────┴────────┴───────────┴───────────┴────────┴──────────┘
//! ```
//!
//! Components never own peripherals; they hold ids and resolve them
//! through the [`PeripheralRegistry`] on each call.

use core::fmt::Write;

use crate::config::{InMode, Name};
use crate::error::ComponentError;
use crate::peripherals::{InputEvent, PeripheralRegistry};

use super::accessory::{
    AID_BASE_LOCK, AID_BASE_OUTLET, AID_BASE_STATELESS_SWITCH, AID_BASE_SWITCH, Category,
    ComponentKey,
};

/// Diagnostic tag for state changes caused by the component's own input.
pub const SOURCE_INPUT: &str = "ext";

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComponentKind {
    Switch = 0,
    Outlet = 1,
    Lock = 2,
    StatelessSwitch = 3,
    HiddenSwitch = 4,
}

impl ComponentKind {
    pub const COUNT: usize = 5;

    /// Kind selected by a switch's configured service type.
    pub fn from_svc_type(svc_type: i32) -> Self {
        match svc_type {
            0 => Self::Switch,
            1 => Self::Outlet,
            2 => Self::Lock,
            _ => Self::HiddenSwitch,
        }
    }

    /// Numeric type shown in status strings.  Hidden switches report as
    /// plain switches.
    pub fn type_code(self) -> u8 {
        match self {
            Self::HiddenSwitch => Self::Switch as u8,
            k => k as u8,
        }
    }

    /// Category of a standalone accessory of this kind.
    pub fn category(self) -> Category {
        match self {
            Self::Switch => Category::Switches,
            Self::Outlet => Category::Outlets,
            Self::Lock => Category::Locks,
            Self::StatelessSwitch => Category::ProgrammableSwitches,
            Self::HiddenSwitch => Category::BridgedAccessory,
        }
    }

    /// Base of the aid range; `None` for kinds never given an accessory.
    pub fn aid_base(self) -> Option<u64> {
        match self {
            Self::Switch => Some(AID_BASE_SWITCH),
            Self::Outlet => Some(AID_BASE_OUTLET),
            Self::Lock => Some(AID_BASE_LOCK),
            Self::StatelessSwitch => Some(AID_BASE_STATELESS_SWITCH),
            Self::HiddenSwitch => None,
        }
    }

    pub fn is_exposed(self) -> bool {
        self != Self::HiddenSwitch
    }

    /// Switch-type components take part in button cycling.
    pub fn is_switch_type(self) -> bool {
        matches!(self, Self::Switch | Self::HiddenSwitch)
    }

    fn behavior(self) -> &'static Behavior {
        &BEHAVIORS[self as usize]
    }
}

// ---------------------------------------------------------------------------
// Behaviour table
// ---------------------------------------------------------------------------

type InitFn = fn(&mut Component, &PeripheralRegistry) -> Result<(), ComponentError>;
type GetStateFn = fn(&Component, &PeripheralRegistry) -> Result<bool, ComponentError>;
type SetStateFn =
    fn(&Component, &mut PeripheralRegistry, bool, &str) -> Result<(), ComponentError>;
type InfoFn = fn(&Component, &PeripheralRegistry, &mut String) -> Result<(), ComponentError>;
type InputFn = fn(
    &mut Component,
    &mut PeripheralRegistry,
    InputEvent,
    bool,
) -> Result<Option<ComponentEffect>, ComponentError>;

/// One row of the behaviour table.
struct Behavior {
    kind: ComponentKind,
    init: InitFn,
    get_state: GetStateFn,
    set_state: SetStateFn,
    info: InfoFn,
    on_input: InputFn,
}

static BEHAVIORS: [Behavior; ComponentKind::COUNT] = [
    Behavior {
        kind: ComponentKind::Switch,
        init: output_init,
        get_state: output_get_state,
        set_state: output_set_state,
        info: output_info,
        on_input: output_on_input,
    },
    Behavior {
        kind: ComponentKind::Outlet,
        init: output_init,
        get_state: output_get_state,
        set_state: output_set_state,
        info: output_info,
        on_input: output_on_input,
    },
    Behavior {
        kind: ComponentKind::Lock,
        init: output_init,
        get_state: output_get_state,
        set_state: output_set_state,
        info: lock_info,
        on_input: output_on_input,
    },
    Behavior {
        kind: ComponentKind::StatelessSwitch,
        init: stateless_init,
        get_state: stateless_get_state,
        set_state: stateless_set_state,
        info: stateless_info,
        on_input: stateless_on_input,
    },
    Behavior {
        kind: ComponentKind::HiddenSwitch,
        init: output_init,
        get_state: output_get_state,
        set_state: output_set_state,
        info: output_info,
        on_input: output_on_input,
    },
];

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Something a component reports back after handling an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentEffect {
    /// The output was driven to a new state.
    StateChanged(bool),
    /// A stateless switch saw a press.
    Press(InputEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    id: i32,
    kind: ComponentKind,
    name: Name,
    in_mode: InMode,
    primary: bool,
    input: Option<i32>,
    output: Option<i32>,
    power_meter: Option<i32>,
    last_press: Option<InputEvent>,
}

impl Component {
    pub fn new(id: i32, kind: ComponentKind, name: &str, in_mode: InMode) -> Self {
        Self {
            id,
            kind,
            name: crate::config::name(name),
            in_mode,
            primary: false,
            input: None,
            output: None,
            power_meter: None,
            last_press: None,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn key(&self) -> ComponentKey {
        ComponentKey {
            kind: self.kind,
            id: self.id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn in_mode(&self) -> InMode {
        self.in_mode
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }

    pub fn input_id(&self) -> Option<i32> {
        self.input
    }

    pub fn output_id(&self) -> Option<i32> {
        self.output
    }

    pub fn power_meter_id(&self) -> Option<i32> {
        self.power_meter
    }

    pub fn last_press(&self) -> Option<InputEvent> {
        self.last_press
    }

    /// Resolve peripherals for this id and check the kind's requirements.
    pub fn init(&mut self, reg: &PeripheralRegistry) -> Result<(), ComponentError> {
        self.input = reg.has_input(self.id).then_some(self.id);
        self.output = reg.has_output(self.id).then_some(self.id);
        self.power_meter = reg.has_power_meter(self.id).then_some(self.id);
        (self.kind.behavior().init)(self, reg)
    }

    pub fn state(&self, reg: &PeripheralRegistry) -> Result<bool, ComponentError> {
        (self.kind.behavior().get_state)(self, reg)
    }

    pub fn set_state(
        &self,
        reg: &mut PeripheralRegistry,
        on: bool,
        source: &str,
    ) -> Result<(), ComponentError> {
        (self.kind.behavior().set_state)(self, reg, on, source)
    }

    /// Human-readable one-line status.
    pub fn info(&self, reg: &PeripheralRegistry) -> Result<String, ComponentError> {
        let mut out = String::new();
        (self.kind.behavior().info)(self, reg, &mut out)?;
        Ok(out)
    }

    /// React to an event on this component's input.
    pub fn handle_input(
        &mut self,
        reg: &mut PeripheralRegistry,
        event: InputEvent,
        level: bool,
    ) -> Result<Option<ComponentEffect>, ComponentError> {
        debug_assert_eq!(self.kind.behavior().kind, self.kind);
        (self.kind.behavior().on_input)(self, reg, event, level)
    }
}

// ---------------------------------------------------------------------------
// Output-backed kinds (switch, outlet, lock, hidden)
// ---------------------------------------------------------------------------

fn output_init(c: &mut Component, _reg: &PeripheralRegistry) -> Result<(), ComponentError> {
    if c.output.is_none() {
        return Err(ComponentError::NoOutput);
    }
    Ok(())
}

fn output_get_state(c: &Component, reg: &PeripheralRegistry) -> Result<bool, ComponentError> {
    c.output
        .and_then(|id| reg.output(id))
        .map(|o| o.state())
        .ok_or(ComponentError::NoOutput)
}

fn output_set_state(
    c: &Component,
    reg: &mut PeripheralRegistry,
    on: bool,
    source: &str,
) -> Result<(), ComponentError> {
    let Some(id) = c.output else {
        return Err(ComponentError::NoOutput);
    };
    let out = reg.output_mut(id).ok_or(ComponentError::NoOutput)?;
    out.set_state(on, source)?;
    Ok(())
}

fn output_info(
    c: &Component,
    reg: &PeripheralRegistry,
    out: &mut String,
) -> Result<(), ComponentError> {
    let on = output_get_state(c, reg)?;
    let _ = write!(out, "st:{}", u8::from(on));
    if let Some(pm) = c.power_meter.and_then(|id| reg.power_meter(id)) {
        match pm.power_w() {
            Ok(w) => {
                let _ = write!(out, " pw:{w:.3}");
            }
            Err(e) => {
                let _ = write!(out, " pw:{e}");
            }
        }
    }
    Ok(())
}

fn lock_info(c: &Component, reg: &PeripheralRegistry, out: &mut String) -> Result<(), ComponentError> {
    // Energised output = unlocked.
    let on = output_get_state(c, reg)?;
    out.push_str(if on { "unlocked" } else { "locked" });
    Ok(())
}

fn output_on_input(
    c: &mut Component,
    reg: &mut PeripheralRegistry,
    event: InputEvent,
    level: bool,
) -> Result<Option<ComponentEffect>, ComponentError> {
    let current = output_get_state(c, reg)?;
    let target = match (c.in_mode, event) {
        (InMode::Momentary, InputEvent::Single) => !current,
        (InMode::Toggle, InputEvent::Change) => level,
        (InMode::Edge, InputEvent::Change) => !current,
        _ => return Ok(None),
    };
    if target == current {
        return Ok(None);
    }
    output_set_state(c, reg, target, SOURCE_INPUT)?;
    Ok(Some(ComponentEffect::StateChanged(target)))
}

// ---------------------------------------------------------------------------
// Stateless switch
// ---------------------------------------------------------------------------

fn stateless_init(c: &mut Component, _reg: &PeripheralRegistry) -> Result<(), ComponentError> {
    if c.input.is_none() {
        return Err(ComponentError::NoInput);
    }
    Ok(())
}

fn stateless_get_state(_c: &Component, _reg: &PeripheralRegistry) -> Result<bool, ComponentError> {
    Err(ComponentError::Stateless)
}

fn stateless_set_state(
    _c: &Component,
    _reg: &mut PeripheralRegistry,
    _on: bool,
    _source: &str,
) -> Result<(), ComponentError> {
    Err(ComponentError::Stateless)
}

fn stateless_info(
    c: &Component,
    _reg: &PeripheralRegistry,
    out: &mut String,
) -> Result<(), ComponentError> {
    let last = match c.last_press {
        Some(InputEvent::Single) => "single",
        Some(InputEvent::Double) => "double",
        Some(InputEvent::Long) => "long",
        Some(InputEvent::Change) | None => "n/a",
    };
    let _ = write!(out, "last:{last}");
    Ok(())
}

fn stateless_on_input(
    c: &mut Component,
    _reg: &mut PeripheralRegistry,
    event: InputEvent,
    _level: bool,
) -> Result<Option<ComponentEffect>, ComponentError> {
    match event {
        InputEvent::Single | InputEvent::Double | InputEvent::Long => {
            c.last_press = Some(event);
            Ok(Some(ComponentEffect::Press(event)))
        }
        InputEvent::Change => Ok(None),
    }
}
