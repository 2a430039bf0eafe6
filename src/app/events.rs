//! Inbound platform events and outbound application events.
//!
//! [`PlatformEvent`]s are posted into the service's
//! [`EventQueue`](crate::events::EventQueue) by adapters (protocol engine,
//! input pins, update engine, timers) and drained once per poll.
//! [`AppEvent`]s leave the core through the
//! [`EventSink`](super::ports::EventSink) port.

use crate::diagnostics::StatusReport;
use crate::peripherals::InputEvent;
use crate::scheduler::DeferredAction;

use super::ports::ServerState;

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// Firmware-update progress reported by the update engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    InProgress,
    /// Image committed; a reboot follows.
    Committed,
    Error,
}

/// Answer to the update engine's begin hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    Proceed,
    /// Ask again later; the server is being stopped.
    Wait,
    Abort,
}

/// Events from platform collaborators, handled one at a time in FIFO order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The protocol engine reached a new state.
    ServerStateChanged(ServerState),
    /// A reboot was requested.
    Reboot,
    /// Final notification before the reboot happens.
    RebootAfter,
    UpdateStatus(UpdateStatus),
    /// A controller asked accessory `aid` to identify itself.
    Identify { aid: u64 },
    /// Debounced event on a switch input.
    Input {
        id: i32,
        event: InputEvent,
        level: bool,
    },
    /// Debounced event on the physical button.
    Button { event: InputEvent, pressed: bool },
    /// A deferred action fell due.
    Timer(DeferredAction),
}

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

/// Structured events emitted by the orchestration core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Boot sequence finished.
    Started { cfg_version: u32 },

    /// The accessory server was started.
    ServiceStarted {
        bridge: bool,
        accessories: usize,
        cn: u16,
    },

    /// A stop was requested from the accessory server.
    ServiceStopping,

    /// The server reached Idle and the catalog was torn down.
    CatalogCleared,

    /// The thermal interlock tripped at this temperature (Celsius).
    OverheatTripped(i32),

    /// The thermal interlock released.
    OverheatCleared(i32),

    /// A switch output changed.
    SwitchChanged {
        id: i32,
        state: bool,
        source: &'static str,
    },

    /// A stateless switch reported a press.
    ProgrammableSwitch { id: i32, press: InputEvent },

    /// The network was reverted to access-point provisioning mode.
    NetworkReset,

    /// A firmware update was refused at the begin hook.
    UpdateRejected,

    /// Periodic status report.
    Status(StatusReport),
}
