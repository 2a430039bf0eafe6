//! Port traits: the hexagonal boundary between orchestration and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (accessory server, status LED, network, event sinks,
//! storage) implement these traits.  The [`AppService`](super::service::AppService)
//! receives them per call through [`Ports`](super::service::Ports), so the
//! core never touches hardware or the protocol engine directly.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::catalog::Accessory;
use crate::config::{DeviceConfig, NetworkConfig};
use crate::error::{NetworkError, ServerError};

// ───────────────────────────────────────────────────────────────
// Accessory server port (domain ↔ protocol engine)
// ───────────────────────────────────────────────────────────────

/// Server state as reported by the protocol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    Idle = 0,
    Running = 1,
    /// Stop requested; sessions are being torn down.
    Stopping = 2,
}

/// The accessory protocol engine, reduced to its lifecycle and queries.
///
/// State changes are reported asynchronously: the adapter posts
/// [`PlatformEvent::ServerStateChanged`](super::events::PlatformEvent) into
/// the service queue.
pub trait AccessoryServerPort {
    fn state(&self) -> ServerState;

    /// At least one controller is paired.
    fn is_paired(&self) -> bool;

    /// Setup code / pairing identity is present and valid.
    fn is_provisioned(&self) -> bool;

    /// Start in single-accessory mode.
    fn start(&mut self, primary: &Accessory);

    /// Start in bridge mode with `bridged` behind the root accessory.
    fn start_bridge(&mut self, primary: &Accessory, bridged: &[Accessory]);

    /// Request a stop.  Completion is reported via a state-change event.
    fn stop(&mut self);

    /// Persisted configuration number.
    fn configuration_number(&self) -> Result<u16, ServerError>;

    /// Increment and persist the configuration number.
    fn increment_configuration_number(&mut self) -> Result<u16, ServerError>;

    /// Number of connected controller sessions.
    fn session_count(&self) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Status LED port (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The single status LED.  Polarity is the adapter's concern: "lit"
/// always means visible light.
pub trait LedPort {
    /// Start a timed blink.  `(0, 0)` cancels any running blink.
    fn blink(&mut self, on_ms: u32, off_ms: u32);

    /// Drive a steady level (cancels any running blink).
    fn set_level(&mut self, lit: bool);

    /// Release the pin (high-impedance input, LED dark, lowest power).
    fn release(&mut self);
}

/// Boards without a status LED: every request is ignored.
impl<L: LedPort> LedPort for Option<L> {
    fn blink(&mut self, on_ms: u32, off_ms: u32) {
        if let Some(led) = self {
            led.blink(on_ms, off_ms);
        }
    }

    fn set_level(&mut self, lit: bool) {
        if let Some(led) = self {
            led.set_level(lit);
        }
    }

    fn release(&mut self) {
        if let Some(led) = self {
            led.release();
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Network port (domain ↔ WiFi stack)
// ───────────────────────────────────────────────────────────────

/// Station link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Associating / authenticating.
    Connecting,
    /// Associated, waiting for an address.
    Connected,
    IpAcquired,
}

pub trait NetworkPort {
    fn link_state(&self) -> LinkState;

    /// Apply station/AP settings to the running stack.
    fn apply(&mut self, config: &NetworkConfig) -> Result<(), NetworkError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.  Injected so deferred actions can be
/// driven deterministically in tests.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the device configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// ranges with [`ConfigError::ValidationFailed`], not clamp them.
pub trait ConfigPort {
    /// Load configuration.  Returns [`DeviceConfig::default()`] if none is stored.
    fn load(&self) -> Result<DeviceConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage (configuration blob, server counters).
///
/// Write operations MUST be atomic; the ESP-IDF NVS API guarantees this
/// natively.  Keys are namespaced per subsystem.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples timers from the event queue)
// ───────────────────────────────────────────────────────────────

/// Callback the [`Scheduler`](crate::scheduler::Scheduler) invokes when a
/// deferred action falls due.  The service queue implements it by posting
/// a platform event, so timers know nothing about the dispatcher.
pub trait SchedulerDelegate {
    fn on_timer_fired(&mut self, action: crate::scheduler::DeferredAction);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A field failed range validation; the message names it.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full => Self::StorageFull,
            StorageError::IoError => Self::IoError,
        }
    }
}

impl From<StorageError> for ServerError {
    fn from(_: StorageError) -> Self {
        Self::Storage
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}
