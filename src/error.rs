//! Unified error types for the relay firmware core.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! housekeeping loop's error handling uniform.  All variants are `Copy` so
//! they can be passed through the orchestration layer without allocation.
//!
//! None of these are fatal: the caller inspects the value and degrades
//! (skips a component, retries next tick, skips a thermal evaluation).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A peripheral could not be read or driven.
    Peripheral(PeripheralError),
    /// A component failed to initialise or rejected a request.
    Component(ComponentError),
    /// The accessory server collaborator reported a failure.
    Server(ServerError),
    /// The network collaborator rejected a configuration.
    Network(NetworkError),
    /// Configuration is invalid or could not be persisted.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peripheral(e) => write!(f, "peripheral: {e}"),
            Self::Component(e) => write!(f, "component: {e}"),
            Self::Server(e) => write!(f, "server: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Peripheral errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralError {
    /// GPIO read returned an error.
    GpioReadFailed,
    /// GPIO set failed.
    GpioWriteFailed,
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// Reading is outside the physically plausible range.
    OutOfRange,
    /// The meter has not produced a first sample yet.
    NotReady,
}

impl fmt::Display for PeripheralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NotReady => write!(f, "no sample yet"),
        }
    }
}

impl From<PeripheralError> for Error {
    fn from(e: PeripheralError) -> Self {
        Self::Peripheral(e)
    }
}

// ---------------------------------------------------------------------------
// Component errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentError {
    /// The component needs an output and none is configured for its id.
    NoOutput,
    /// The component needs an input and none is configured for its id.
    NoInput,
    /// The component has no boolean state (stateless switch).
    Stateless,
    /// The underlying peripheral failed.
    Peripheral(PeripheralError),
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOutput => write!(f, "no output"),
            Self::NoInput => write!(f, "no input"),
            Self::Stateless => write!(f, "component has no state"),
            Self::Peripheral(e) => write!(f, "{e}"),
        }
    }
}

impl From<PeripheralError> for ComponentError {
    fn from(e: PeripheralError) -> Self {
        Self::Peripheral(e)
    }
}

impl From<ComponentError> for Error {
    fn from(e: ComponentError) -> Self {
        Self::Component(e)
    }
}

// ---------------------------------------------------------------------------
// Accessory server errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerError {
    /// The persisted configuration number could not be read or written.
    Storage,
    /// The request is not valid in the server's current state.
    InvalidState,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage => write!(f, "key-value store error"),
            Self::InvalidState => write!(f, "invalid server state"),
        }
    }
}

impl From<ServerError> for Error {
    fn from(e: ServerError) -> Self {
        Self::Server(e)
    }
}

// ---------------------------------------------------------------------------
// Network errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    InvalidSsid,
    ApplyFailed,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid"),
            Self::ApplyFailed => write!(f, "failed to apply network settings"),
        }
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

// ---------------------------------------------------------------------------
// System temperature query
// ---------------------------------------------------------------------------

/// Outcome of the best-effort system temperature query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureError {
    /// No system temperature sensor is configured.
    NotFound,
    /// The sensor exists but failed this read.
    Sensor(PeripheralError),
}

impl fmt::Display for TemperatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Sensor(e) => write!(f, "{e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
