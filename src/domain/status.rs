//! Lifecycle status types with explicit transition tables.
//!
//! Event, round, participant, and alert lifecycles are tagged unions with
//! a `can_transition_to` predicate instead of free-form string columns.
//! Invalid transitions are rejected at the service layer before any SQL
//! runs; terminal participant statuses are additionally guarded inside
//! the UPDATE statements themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArenaError;

/// Event lifecycle: `waiting → active → finished`, `finished` terminal.
///
/// `waiting` and `active` are both treated as "open" for roster and
/// leaderboard purposes; only `finished` closes an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Created, open for joins.
    Waiting,
    /// Running, still open for joins.
    Active,
    /// Terminal. No reopening.
    Finished,
}

impl EventStatus {
    /// Returns the canonical storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    /// Returns `true` while the event accepts joins and broadcasts.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Waiting | Self::Active)
    }
}

/// Round lifecycle: `waiting → countdown → playing → finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Created; participants seeded, not yet started.
    Waiting,
    /// Server-timed countdown in progress.
    Countdown,
    /// Live; score updates accepted.
    Playing,
    /// Terminal; scores archived.
    Finished,
}

impl RoundStatus {
    /// Returns the canonical storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Countdown => "countdown",
            Self::Playing => "playing",
            Self::Finished => "finished",
        }
    }

    /// Forward-only transition table. No backward edges, `finished` is
    /// terminal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::Countdown)
                | (Self::Countdown, Self::Playing)
                | (Self::Waiting | Self::Countdown | Self::Playing, Self::Finished)
        )
    }

    /// Returns `true` once the round has been archived.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Per-round participant status.
///
/// `finished`, `eliminated`, and `disqualified` are terminal for the
/// round: once set, no further score mutation is accepted for that
/// (round, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Seeded into the round, not yet playing.
    Waiting,
    /// Actively playing; live score updates apply.
    Playing,
    /// Completed the round. Terminal.
    Finished,
    /// Knocked out (by gameplay or validation failure). Terminal.
    Eliminated,
    /// Removed by the disqualification cascade. Terminal.
    Disqualified,
}

impl ParticipantStatus {
    /// Returns the canonical storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Finished => "finished",
            Self::Eliminated => "eliminated",
            Self::Disqualified => "disqualified",
        }
    }

    /// Terminal statuses reject further mutation within the round.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Eliminated | Self::Disqualified)
    }

    /// Presentation ordering used by round player listings: playing
    /// first, then waiting, finished, eliminated, everything else last.
    #[must_use]
    pub const fn display_rank(self) -> u8 {
        match self {
            Self::Playing => 1,
            Self::Waiting => 2,
            Self::Finished => 3,
            Self::Eliminated => 4,
            Self::Disqualified => 5,
        }
    }
}

/// Resolution status shared by suspicious activities and security alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// Awaiting admin review.
    Pending,
    /// Reviewed and dismissed; no effect on the user.
    Dismissed,
    /// Resolved by disqualifying the user.
    Disqualified,
}

impl AlertStatus {
    /// Returns the canonical storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dismissed => "dismissed",
            Self::Disqualified => "disqualified",
        }
    }
}

/// Severity of a suspicious activity, derived from its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Default bucket for unrecognized reasons.
    Low,
    /// Long pauses, statistical anomalies.
    Medium,
    /// Impossible scores, excessive pauses, rate limiting.
    High,
    /// Devtools, time jumps, score/event mismatches.
    Critical,
}

impl Severity {
    /// Returns the canonical storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Supported mini-game types.
///
/// The games themselves are client-side loops; the server only needs the
/// discriminator for validation and archival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    /// Flappy-style obstacle game; score equals obstacles passed.
    Flybird,
    /// Vertical endless runner; score is roughly height / 10.
    EndlessRunner,
    /// Reaction time trials.
    Reaction,
}

impl GameType {
    /// Returns the canonical storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flybird => "flybird",
            Self::EndlessRunner => "endless_runner",
            Self::Reaction => "reaction",
        }
    }
}

macro_rules! impl_from_str {
    ($ty:ty, $err:ident, [$(($s:literal, $v:expr)),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = ArenaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($v),)+
                    other => Err(ArenaError::$err(other.to_string())),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_from_str!(
    EventStatus,
    Internal,
    [
        ("waiting", Self::Waiting),
        ("active", Self::Active),
        ("finished", Self::Finished),
    ]
);

impl_from_str!(
    RoundStatus,
    Internal,
    [
        ("waiting", Self::Waiting),
        ("countdown", Self::Countdown),
        ("playing", Self::Playing),
        ("finished", Self::Finished),
    ]
);

impl_from_str!(
    ParticipantStatus,
    Internal,
    [
        ("waiting", Self::Waiting),
        ("playing", Self::Playing),
        ("finished", Self::Finished),
        ("eliminated", Self::Eliminated),
        ("disqualified", Self::Disqualified),
    ]
);

impl_from_str!(
    AlertStatus,
    Internal,
    [
        ("pending", Self::Pending),
        ("dismissed", Self::Dismissed),
        ("disqualified", Self::Disqualified),
    ]
);

impl_from_str!(
    Severity,
    Internal,
    [
        ("low", Self::Low),
        ("medium", Self::Medium),
        ("high", Self::High),
        ("critical", Self::Critical),
    ]
);

impl_from_str!(
    GameType,
    InvalidGameType,
    [
        ("flybird", Self::Flybird),
        ("endless_runner", Self::EndlessRunner),
        ("reaction", Self::Reaction),
    ]
);

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn round_transitions_forward_only() {
        assert!(RoundStatus::Waiting.can_transition_to(RoundStatus::Countdown));
        assert!(RoundStatus::Countdown.can_transition_to(RoundStatus::Playing));
        assert!(RoundStatus::Playing.can_transition_to(RoundStatus::Finished));
        assert!(RoundStatus::Waiting.can_transition_to(RoundStatus::Finished));

        assert!(!RoundStatus::Playing.can_transition_to(RoundStatus::Countdown));
        assert!(!RoundStatus::Finished.can_transition_to(RoundStatus::Waiting));
        assert!(!RoundStatus::Finished.can_transition_to(RoundStatus::Playing));
        assert!(!RoundStatus::Waiting.can_transition_to(RoundStatus::Playing));
    }

    #[test]
    fn terminal_participant_statuses() {
        assert!(ParticipantStatus::Finished.is_terminal());
        assert!(ParticipantStatus::Eliminated.is_terminal());
        assert!(ParticipantStatus::Disqualified.is_terminal());
        assert!(!ParticipantStatus::Waiting.is_terminal());
        assert!(!ParticipantStatus::Playing.is_terminal());
    }

    #[test]
    fn display_rank_orders_playing_first() {
        assert!(
            ParticipantStatus::Playing.display_rank() < ParticipantStatus::Waiting.display_rank()
        );
        assert!(
            ParticipantStatus::Waiting.display_rank() < ParticipantStatus::Finished.display_rank()
        );
        assert!(
            ParticipantStatus::Finished.display_rank()
                < ParticipantStatus::Eliminated.display_rank()
        );
    }

    #[test]
    fn event_open_states() {
        assert!(EventStatus::Waiting.is_open());
        assert!(EventStatus::Active.is_open());
        assert!(!EventStatus::Finished.is_open());
    }

    #[test]
    fn storage_string_round_trip() {
        for status in [
            RoundStatus::Waiting,
            RoundStatus::Countdown,
            RoundStatus::Playing,
            RoundStatus::Finished,
        ] {
            assert_eq!(status.as_str().parse::<RoundStatus>().ok(), Some(status));
        }
        for status in [
            ParticipantStatus::Waiting,
            ParticipantStatus::Playing,
            ParticipantStatus::Finished,
            ParticipantStatus::Eliminated,
            ParticipantStatus::Disqualified,
        ] {
            assert_eq!(
                status.as_str().parse::<ParticipantStatus>().ok(),
                Some(status)
            );
        }
    }

    #[test]
    fn unknown_game_type_is_rejected() {
        let parsed = "tetris".parse::<GameType>();
        assert!(parsed.is_err());
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
