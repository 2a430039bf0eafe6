//! Inbound commands to the application service.
//!
//! Requests from the diagnostics/RPC collaborator that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

/// Commands that external adapters can send into the orchestration core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Start the accessory server (e.g. right after provisioning over RPC).
    StartService,

    /// Stop the accessory server.
    StopService,

    /// Stop, bump the configuration number and restart on the next tick.
    RestartService,

    /// Drive switch `id` to `on`.
    SetSwitch { id: i32, on: bool },

    /// Blink the identify pattern.
    Identify,

    /// Persist the configuration now if it has unsaved changes.
    SaveConfig,
}
