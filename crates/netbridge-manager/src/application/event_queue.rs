//! FIFO queue between the transport's status callback (producer) and the
//! application's poll loop (consumer).
//!
//! # Thread safety
//!
//! The queue sits behind a `std::sync::Mutex`, so a transport may invoke its
//! callback from any thread.  Push and pop are mutually exclusive; neither
//! holds the lock for longer than one `VecDeque` operation.
//!
//! # Capacity
//!
//! The queue is unbounded by default.  An application that never polls will
//! grow it without limit, so hosts that cannot guarantee a poll loop should
//! set a capacity.  When a bounded queue is full the *incoming* event is
//! dropped and counted; events already queued keep their order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use netbridge_core::Event;
use tracing::warn;

/// A mutex-guarded FIFO of connection [`Event`]s.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<VecDeque<Event>>,
    capacity: Option<usize>,
    dropped: AtomicU64,
}

impl EventQueue {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue that holds at most `capacity` events; `None` means
    /// unbounded.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Appends `event` to the back of the queue.
    ///
    /// Returns `false` when the queue is at capacity and the event was dropped.
    pub fn push(&self, event: Event) -> bool {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if self.capacity.is_some_and(|cap| events.len() >= cap) {
            drop(events);
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("event queue full; dropping {event} ({total} dropped so far)");
            return false;
        }
        events.push_back(event);
        true
    }

    /// Removes and returns the oldest event.
    pub fn pop(&self) -> Option<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
