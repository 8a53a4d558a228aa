//! Outbound notices reflecting state changes.
//!
//! Every state mutation publishes a [`Notice`] through the
//! [`super::EventBus`]. Each notice is tagged with the [`Topic`] it
//! belongs to; connections filter on their subscription set. Delivery is
//! at-most-once, fire-and-forget: clients recover missed pushes by
//! re-fetching current state on (re)connect.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::{AlertId, EventId, RoundId, UserId};
use super::model::{LeaderboardEntry, RosterEntry};
use super::status::GameType;
use super::topic::Topic;

/// Admin action that resolved a security alert.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertAction {
    /// Alert dismissed; no effect on the user.
    Dismissed,
    /// Alert resolved by disqualifying the user.
    Disqualified,
}

/// A push delivered to all subscribers of one topic.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// A user joined the event roster.
    ParticipantJoined {
        /// Owning event.
        event_id: EventId,
        /// Joining user.
        user_id: UserId,
        /// Joining user's display name.
        username: String,
        /// Join timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A user left the event roster.
    ParticipantLeft {
        /// Owning event.
        event_id: EventId,
        /// Leaving user.
        user_id: UserId,
        /// Leaving user's display name.
        username: String,
        /// Leave timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Full roster snapshot, pushed after every join/leave.
    RosterUpdated {
        /// Owning event.
        event_id: EventId,
        /// Current roster.
        participants: Vec<RosterEntry>,
    },

    /// An admin created a round for the event.
    RoundCreated {
        /// Owning event.
        event_id: EventId,
        /// New round.
        round_id: RoundId,
        /// Game type to be played.
        game_type: GameType,
    },

    /// One tick of the server-authoritative countdown.
    CountdownTick {
        /// Counting round.
        round_id: RoundId,
        /// Seconds remaining; playing starts at zero.
        remaining: u32,
    },

    /// The countdown reached zero; the round is now playing.
    RoundStarted {
        /// Started round.
        round_id: RoundId,
        /// Start timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Waiting-room occupancy for a round.
    WaitingCount {
        /// Target round.
        round_id: RoundId,
        /// Participants still waiting.
        waiting: usize,
        /// Total participants seeded into the round.
        total: usize,
    },

    /// A round was archived.
    RoundFinished {
        /// Owning event, so clients can redirect.
        event_id: EventId,
        /// Archived round.
        round_id: RoundId,
    },

    /// Leaderboard snapshot, periodic or event-driven.
    LeaderboardUpdated {
        /// Owning event.
        event_id: EventId,
        /// Ranked entries.
        entries: Vec<LeaderboardEntry>,
    },

    /// The recipient was eliminated from a round.
    Eliminated {
        /// Eliminated user.
        user_id: UserId,
        /// Round the user was eliminated from.
        round_id: RoundId,
        /// Owning event, so the client can redirect.
        event_id: EventId,
    },

    /// The recipient completed a round.
    Finished {
        /// Finishing user.
        user_id: UserId,
        /// Completed round.
        round_id: RoundId,
        /// Owning event, so the client can redirect.
        event_id: EventId,
    },

    /// The recipient's score submission failed validation.
    ValidationFailed {
        /// Rejected user.
        user_id: UserId,
        /// Round of the rejected submission.
        round_id: RoundId,
        /// Human-readable rejection message.
        message: String,
    },

    /// A security alert was created or its activity list grew.
    AlertRaised {
        /// Alert identifier.
        alert_id: AlertId,
        /// Flagged user.
        user_id: UserId,
        /// Owning event.
        event_id: EventId,
        /// Aggregated activity count.
        activity_count: i32,
        /// Timestamp of the raise/update.
        timestamp: DateTime<Utc>,
    },

    /// An admin resolved a security alert.
    AlertResolved {
        /// Alert identifier.
        alert_id: AlertId,
        /// How the alert was resolved.
        action: AlertAction,
        /// Resolving admin.
        admin_id: UserId,
    },

    /// The recipient was disqualified.
    UserDisqualified {
        /// Disqualified user.
        user_id: UserId,
        /// Reason recorded by the admin.
        reason: String,
    },
}

impl Notice {
    /// Returns the topic this notice is delivered to.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::ParticipantJoined { event_id, .. }
            | Self::ParticipantLeft { event_id, .. }
            | Self::RosterUpdated { event_id, .. }
            | Self::RoundCreated { event_id, .. }
            | Self::RoundFinished { event_id, .. } => Topic::Event {
                event_id: *event_id,
            },
            Self::CountdownTick { round_id, .. }
            | Self::RoundStarted { round_id, .. }
            | Self::WaitingCount { round_id, .. } => Topic::Round {
                round_id: *round_id,
            },
            Self::LeaderboardUpdated { event_id, .. } => Topic::Leaderboard {
                event_id: *event_id,
            },
            Self::Eliminated { user_id, .. }
            | Self::Finished { user_id, .. }
            | Self::ValidationFailed { user_id, .. }
            | Self::UserDisqualified { user_id, .. } => Topic::User { user_id: *user_id },
            Self::AlertRaised { .. } | Self::AlertResolved { .. } => Topic::AdminSecurity,
        }
    }

    /// Returns the notice kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::ParticipantLeft { .. } => "participant_left",
            Self::RosterUpdated { .. } => "roster_updated",
            Self::RoundCreated { .. } => "round_created",
            Self::CountdownTick { .. } => "countdown_tick",
            Self::RoundStarted { .. } => "round_started",
            Self::WaitingCount { .. } => "waiting_count",
            Self::RoundFinished { .. } => "round_finished",
            Self::LeaderboardUpdated { .. } => "leaderboard_updated",
            Self::Eliminated { .. } => "eliminated",
            Self::Finished { .. } => "finished",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::AlertRaised { .. } => "alert_raised",
            Self::AlertResolved { .. } => "alert_resolved",
            Self::UserDisqualified { .. } => "user_disqualified",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn roster_notices_target_event_topic() {
        let event_id = EventId::new();
        let notice = Notice::RosterUpdated {
            event_id,
            participants: vec![],
        };
        assert_eq!(notice.topic(), Topic::Event { event_id });
        assert_eq!(notice.kind_str(), "roster_updated");
    }

    #[test]
    fn countdown_targets_round_topic() {
        let round_id = RoundId::new();
        let notice = Notice::CountdownTick {
            round_id,
            remaining: 3,
        };
        assert_eq!(notice.topic(), Topic::Round { round_id });
    }

    #[test]
    fn security_notices_target_admin_topic() {
        let notice = Notice::AlertRaised {
            alert_id: AlertId::new(),
            user_id: UserId::new(),
            event_id: EventId::new(),
            activity_count: 3,
            timestamp: Utc::now(),
        };
        assert_eq!(notice.topic(), Topic::AdminSecurity);
    }

    #[test]
    fn disqualification_targets_user_channel() {
        let user_id = UserId::new();
        let notice = Notice::UserDisqualified {
            user_id,
            reason: "score manipulation".to_string(),
        };
        assert_eq!(notice.topic(), Topic::User { user_id });
    }

    #[test]
    fn serializes_with_notice_tag() {
        let notice = Notice::CountdownTick {
            round_id: RoundId::new(),
            remaining: 5,
        };
        let json = serde_json::to_string(&notice).unwrap_or_default();
        assert!(json.contains("countdown_tick"));
        assert!(json.contains("\"remaining\":5"));
    }
}
