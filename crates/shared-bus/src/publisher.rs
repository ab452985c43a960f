//! # Emitter fan-out
//!
//! Flushing a committed block's [`EventBuffer`](crate::events::EventBuffer)
//! broadcasts its events to every registered emitter. Delivery is
//! best-effort: a lagging or absent emitter never blocks block production,
//! matching the "fire and forget after commit" rule — events are a side
//! channel, not part of consensus.

use crate::events::EventBuffer;
use crate::DEFAULT_CHANNEL_CAPACITY;
use shared_types::Event;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// In-memory best-effort event bus for a single node process.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<Event>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a bus with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Register a new best-effort receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Flush a committed block's events to every subscriber, in order.
    /// Returns how many events were delivered to at least one subscriber.
    pub fn flush(&self, buffer: EventBuffer) -> usize {
        let mut delivered = 0;
        for event in buffer.drain() {
            self.events_published.fetch_add(1, Ordering::Relaxed);
            match self.sender.send(event) {
                Ok(receivers) => {
                    debug!(receivers, "event delivered");
                    delivered += 1;
                }
                Err(_) => warn!("event dropped: no subscribers"),
            }
        }
        delivered
    }

    /// Total events ever flushed, whether or not they had subscribers.
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Currently registered subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Configured channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_with_no_subscribers_still_counts() {
        let bus = InMemoryEventBus::new();
        let mut buf = EventBuffer::new();
        buf.push(Event::new("transfer.native"));
        bus.flush(buf);
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn subscriber_receives_in_order() {
        let bus = InMemoryEventBus::new();
        let mut rx = bus.subscribe();

        let mut buf = EventBuffer::new();
        buf.push(Event::new("a"));
        buf.push(Event::new("b"));
        bus.flush(buf);

        assert_eq!(rx.recv().await.unwrap().event_type, "a");
        assert_eq!(rx.recv().await.unwrap().event_type, "b");
    }

    #[test]
    fn custom_capacity_reported() {
        let bus = InMemoryEventBus::with_capacity(64);
        assert_eq!(bus.capacity(), 64);
    }
}
