//! # Per-block event buffer
//!
//! During block application the processor appends an [`Event`] for every
//! state change it makes. The buffer preserves emission order (callers never
//! see `stake.rewardsClaimed` before the `transfer.native` that funded it);
//! it is flushed to registered emitters only after the block commits, so a
//! rolled-back block never leaks events downstream.

use shared_types::Event;

/// Ordered, append-only buffer of events produced while applying one block.
#[derive(Debug, Default, Clone)]
pub struct EventBuffer {
    events: Vec<Event>,
}

impl EventBuffer {
    /// Start a fresh, empty buffer.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event, preserving call order.
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Borrow the events in emission order.
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Consume the buffer, returning its events in emission order. Used once
    /// a block commits; a rolled-back block simply drops its buffer.
    pub fn drain(self) -> Vec<Event> {
        self.events
    }
}
