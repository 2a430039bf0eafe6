//! One-shot deferred actions.
//!
//! Deferred work (the reset sequence's 600 ms delay) is expressed as a
//! one-shot timer entry, never a blocking sleep.  The scheduler is driven
//! by the caller's millisecond clock and notifies a [`SchedulerDelegate`]
//! when an entry falls due; the service implements the delegate by posting
//! into its event queue.
//!
//! ```text
//!  schedule_once(action, delay) ──▶ [slot 0..3] ──tick(now)──▶ delegate
//!                                                              │
//!                                                              ▼
//!                                                        EventQueue
//! ```

use crate::app::ports::SchedulerDelegate;
use log::{debug, warn};

/// Maximum number of concurrently pending actions.
const MAX_PENDING: usize = 4;

/// Actions that can be deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Revert the network to access-point provisioning mode.
    NetworkReset,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    action: DeferredAction,
    due_ms: u64,
}

/// Fixed-slot one-shot timer table.
#[derive(Debug, Default)]
pub struct Scheduler {
    slots: [Option<Entry>; MAX_PENDING],
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to fire `delay_ms` after `now_ms`.
    /// Returns the slot index, or `None` if every slot is taken.
    pub fn schedule_once(
        &mut self,
        action: DeferredAction,
        delay_ms: u32,
        now_ms: u64,
    ) -> Option<usize> {
        let due_ms = now_ms.saturating_add(u64::from(delay_ms));
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                debug!("Scheduler: {:?} due at {} ms (slot {})", action, due_ms, i);
                *slot = Some(Entry { action, due_ms });
                return Some(i);
            }
        }
        warn!("Scheduler: no free slot for {:?}", action);
        None
    }

    pub fn is_pending(&self, action: DeferredAction) -> bool {
        self.slots.iter().flatten().any(|e| e.action == action)
    }

    /// Fire every entry due at or before `now_ms`, in due order.
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        while let Some(i) = self.earliest_due(now_ms) {
            if let Some(entry) = self.slots[i].take() {
                debug!("Scheduler: firing {:?}", entry.action);
                delegate.on_timer_fired(entry.action);
            }
        }
    }

    fn earliest_due(&self, now_ms: u64) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|e| (i, e.due_ms)))
            .filter(|&(_, due)| due <= now_ms)
            .min_by_key(|&(_, due)| due)
            .map(|(i, _)| i)
    }
}
