//! Per-connection topic membership.
//!
//! Each WebSocket connection owns one [`SubscriptionSet`]: an explicit
//! registry of the topics the client has joined. Notices from the bus
//! are delivered only when their topic is in the set. Membership dies
//! with the connection; a reconnecting client re-joins and re-fetches.

use std::collections::HashSet;

use crate::domain::Topic;

/// The set of topics one WebSocket connection is subscribed to.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    topics: HashSet<Topic>,
}

impl SubscriptionSet {
    /// Creates an empty subscription set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins a topic. Returns `true` when the topic was newly added.
    pub fn join(&mut self, topic: Topic) -> bool {
        self.topics.insert(topic)
    }

    /// Leaves a topic. Returns `true` when the topic was present.
    pub fn leave(&mut self, topic: &Topic) -> bool {
        self.topics.remove(topic)
    }

    /// Returns `true` if the connection should receive pushes for the
    /// given topic.
    #[must_use]
    pub fn matches(&self, topic: &Topic) -> bool {
        self.topics.contains(topic)
    }

    /// Returns the number of joined topics.
    #[must_use]
    pub fn count(&self) -> usize {
        self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, RoundId, UserId};

    #[test]
    fn empty_matches_nothing() {
        let subs = SubscriptionSet::new();
        assert!(!subs.matches(&Topic::Event {
            event_id: EventId::new()
        }));
        assert!(!subs.matches(&Topic::AdminSecurity));
    }

    #[test]
    fn join_and_leave() {
        let mut subs = SubscriptionSet::new();
        let topic = Topic::Round {
            round_id: RoundId::new(),
        };
        assert!(subs.join(topic));
        assert!(!subs.join(topic));
        assert!(subs.matches(&topic));
        assert!(subs.leave(&topic));
        assert!(!subs.matches(&topic));
        assert!(!subs.leave(&topic));
    }

    #[test]
    fn round_and_playing_rooms_are_distinct() {
        let mut subs = SubscriptionSet::new();
        let round_id = RoundId::new();
        subs.join(Topic::Round { round_id });
        assert!(subs.matches(&Topic::Round { round_id }));
        assert!(!subs.matches(&Topic::RoundPlaying { round_id }));
    }

    #[test]
    fn user_channel_is_exact() {
        let mut subs = SubscriptionSet::new();
        let user_id = UserId::new();
        subs.join(Topic::User { user_id });
        assert!(subs.matches(&Topic::User { user_id }));
        assert!(!subs.matches(&Topic::User {
            user_id: UserId::new()
        }));
        assert_eq!(subs.count(), 1);
    }
}
