//! Broadcast channel for outbound notices.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every state
//! mutation publishes a [`Notice`] through the bus, and all WebSocket
//! connections subscribe to receive topic-filtered notices.

use tokio::sync::broadcast;

use super::Notice;

/// Broadcast bus for [`Notice`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest notices are
/// dropped for lagging receivers — acceptable under the at-most-once
/// delivery contract.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Notice>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes a notice to all subscribers.
    ///
    /// Returns the number of receivers that received the notice.
    /// If there are no active receivers, the notice is silently dropped.
    pub fn publish(&self, notice: Notice) -> usize {
        self.sender.send(notice).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future notices.
    ///
    /// Each WebSocket connection calls this once on connect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{RoundId, Topic};

    fn make_notice(round_id: RoundId) -> Notice {
        Notice::CountdownTick {
            round_id,
            remaining: 5,
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(100);
        let count = bus.publish(make_notice(RoundId::new()));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn subscriber_receives_notice() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        let round_id = RoundId::new();
        bus.publish(make_notice(round_id));

        let notice = rx.recv().await;
        let Ok(notice) = notice else {
            panic!("expected to receive notice");
        };
        assert_eq!(notice.topic(), Topic::Round { round_id });
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_notice() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let round_id = RoundId::new();
        let count = bus.publish(make_notice(round_id));
        assert_eq!(count, 2);

        let n1 = rx1.recv().await;
        let n2 = rx2.recv().await;
        let Ok(n1) = n1 else {
            panic!("rx1 failed");
        };
        let Ok(n2) = n2 else {
            panic!("rx2 failed");
        };
        assert_eq!(n1.topic(), n2.topic());
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(100);
        assert_eq!(bus.receiver_count(), 0);

        let _rx1 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(_rx1);
        assert_eq!(bus.receiver_count(), 1);
    }
}
