//! Platform event queue.
//!
//! Events are produced by:
//! - the accessory server (state-change notifications)
//! - input pins (debounced edges and gestures)
//! - the update engine and reboot path
//! - the deferred-action [`Scheduler`](crate::scheduler::Scheduler)
//!
//! and consumed by the service's single dispatcher, one at a time in FIFO
//! order, once per poll.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ HAP server  │────▶│              │     │                  │
//! │ Input pins  │────▶│  EventQueue  │────▶│ AppService::poll │
//! │ Update/boot │────▶│  (bounded)   │     │   (dispatcher)   │
//! │ Scheduler   │────▶│              │     │                  │
//! └─────────────┘     └──────────────┘     └──────────────────┘
//! ```
//!
//! The queue is an instance owned by the service, so independent service
//! instances never share events.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::events::PlatformEvent;
use crate::app::ports::SchedulerDelegate;
use crate::scheduler::DeferredAction;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 32;

/// Bounded multi-producer queue of [`PlatformEvent`]s.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, PlatformEvent, EVENT_QUEUE_CAP>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Post an event.  Returns `false` if the queue is full (event dropped).
    pub fn post(&self, event: PlatformEvent) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("Event queue full, dropping {:?}", event);
                false
            }
        }
    }

    /// Pop the next event, if any.
    pub fn pop(&self) -> Option<PlatformEvent> {
        self.channel.try_receive().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }
}

impl SchedulerDelegate for EventQueue {
    fn on_timer_fired(&mut self, action: DeferredAction) {
        self.post(PlatformEvent::Timer(action));
    }
}
