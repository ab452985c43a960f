//! # Shared Bus
//!
//! The ordered per-block [`events::EventBuffer`] the state processor fills
//! while applying a block, and the best-effort [`publisher::InMemoryEventBus`]
//! that flushes it to subscribers once the block commits.

pub mod events;
pub mod publisher;

pub use events::EventBuffer;
pub use publisher::InMemoryEventBus;

/// Default broadcast channel capacity for [`InMemoryEventBus`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_reasonable() {
        let bus = InMemoryEventBus::new();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
    }
}
