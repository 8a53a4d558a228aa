//! Broadcast topics.
//!
//! A [`Topic`] is a named broadcast scope that subscribers join to
//! receive pushes: per-event room, per-round room, a playing sub-room
//! per round, a leaderboard room per event, a per-user channel, and a
//! privileged admin-security namespace. Topic membership is held in the
//! per-connection subscription set, never in ambient globals.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EventId, RoundId, UserId};

/// A named broadcast scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Topic {
    /// Roster and round-lifecycle pushes for one event.
    Event {
        /// Target event.
        event_id: EventId,
    },
    /// Countdown ticks and waiting-room counts for one round.
    Round {
        /// Target round.
        round_id: RoundId,
    },
    /// Sub-room joined by participants actively playing a round.
    RoundPlaying {
        /// Target round.
        round_id: RoundId,
    },
    /// Periodic and event-driven leaderboard snapshots for one event.
    Leaderboard {
        /// Target event.
        event_id: EventId,
    },
    /// Per-user channel for redirects, validation notices, and
    /// disqualification notices.
    User {
        /// Target user.
        user_id: UserId,
    },
    /// Admin-only security alert feed. Requires `role = admin` at
    /// connection time.
    AdminSecurity,
}

impl Topic {
    /// Returns `true` when the topic requires an admin connection.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::AdminSecurity)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event { event_id } => write!(f, "event:{event_id}"),
            Self::Round { round_id } => write!(f, "round:{round_id}"),
            Self::RoundPlaying { round_id } => write!(f, "round:playing:{round_id}"),
            Self::Leaderboard { event_id } => write!(f, "leaderboard:{event_id}"),
            Self::User { user_id } => write!(f, "user:{user_id}"),
            Self::AdminSecurity => write!(f, "admin:security"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_security_is_privileged() {
        assert!(Topic::AdminSecurity.is_privileged());
        assert!(
            !Topic::Event {
                event_id: EventId::new()
            }
            .is_privileged()
        );
        assert!(
            !Topic::User {
                user_id: UserId::new()
            }
            .is_privileged()
        );
    }

    #[test]
    fn display_uses_room_names() {
        let event_id = EventId::new();
        let topic = Topic::Leaderboard { event_id };
        assert_eq!(format!("{topic}"), format!("leaderboard:{event_id}"));
        assert_eq!(format!("{}", Topic::AdminSecurity), "admin:security");
    }

    #[test]
    fn same_scope_same_id_is_equal() {
        let round_id = RoundId::new();
        assert_eq!(Topic::Round { round_id }, Topic::Round { round_id });
        assert_ne!(
            Topic::Round { round_id },
            Topic::RoundPlaying { round_id }
        );
    }
}
