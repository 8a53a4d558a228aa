//! Core entities and read models.
//!
//! These are the durable shapes of the system: events, rosters, rounds,
//! per-round participants, archived scores, and the security records.
//! The persistence layer materializes them from parameterized queries;
//! services and the fan-out layer pass them around unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ActivityId, AlertId, EventId, RoundId, UserId};
use super::status::{AlertStatus, EventStatus, GameType, ParticipantStatus, RoundStatus, Severity};

/// A scheduled competitive session containing a roster and rounds.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Admin who created the event.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One roster member of an event.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    /// Participant user ID.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// When the user joined the event.
    pub joined_at: DateTime<Utc>,
}

/// One timed play session of a specific game type within an event.
#[derive(Debug, Clone, Serialize)]
pub struct Round {
    /// Round identifier.
    pub id: RoundId,
    /// Owning event.
    pub event_id: EventId,
    /// Game type played in this round.
    pub game_type: GameType,
    /// Lifecycle status.
    pub status: RoundStatus,
    /// Admin who created the round.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set when the countdown starts.
    pub started_at: Option<DateTime<Utc>>,
    /// Set when the round is archived.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Round player view for waiting rooms and admin listings, joined with
/// the username.
#[derive(Debug, Clone, Serialize)]
pub struct RoundPlayer {
    /// Participant user ID.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Play status.
    pub status: ParticipantStatus,
    /// Current score.
    pub score: i64,
    /// Opaque client metadata.
    pub metadata: serde_json::Value,
}

/// One ranked row of an event leaderboard.
///
/// `total_score` unions archived scores with live scores from
/// non-finished rounds; zero-score roster members still appear.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    /// Participant user ID.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Archived + live score sum.
    pub total_score: i64,
    /// Number of contributing score rows.
    pub rounds_played: i64,
    /// Whether the user is playing the active round (decorated view only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    /// Live score in the active round (decorated view only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_score: Option<i64>,
}

/// Aggregate returned on event join / get: event, roster, leaderboard,
/// and the most recent non-finished round if any.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetails {
    /// The event itself.
    pub event: Event,
    /// Current roster.
    pub participants: Vec<RosterEntry>,
    /// Current combined leaderboard.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Active (non-finished) round, if one exists.
    pub active_round: Option<Round>,
}

/// A single flagged anomaly tied to one user and round.
#[derive(Debug, Clone, Serialize)]
pub struct SuspiciousActivity {
    /// Activity identifier.
    pub id: ActivityId,
    /// Flagged user.
    pub user_id: UserId,
    /// Round in which the anomaly occurred.
    pub round_id: RoundId,
    /// Owning event, resolved from the round.
    pub event_id: EventId,
    /// Machine-readable reason string.
    pub reason: String,
    /// Context captured at flag time.
    pub details: serde_json::Value,
    /// Severity derived from the reason.
    pub severity: Severity,
    /// Resolution status; updated in bulk with the parent alert.
    pub status: AlertStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Aggregation of recent suspicious activities awaiting admin review.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAlert {
    /// Alert identifier.
    pub id: AlertId,
    /// Flagged user.
    pub user_id: UserId,
    /// Owning event.
    pub event_id: EventId,
    /// Number of activities aggregated into this alert.
    pub activity_count: i32,
    /// IDs of the aggregated activities.
    pub activities: Vec<ActivityId>,
    /// Resolution status.
    pub status: AlertStatus,
    /// Admin who resolved the alert, if resolved.
    pub admin_decision: Option<UserId>,
    /// Free-form admin notes.
    pub admin_notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Resolution timestamp.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Pending alert hydrated with display fields for the admin feed.
#[derive(Debug, Clone, Serialize)]
pub struct AlertView {
    /// The alert record.
    #[serde(flatten)]
    pub alert: SecurityAlert,
    /// Flagged user's display name.
    pub username: String,
    /// Owning event's display name.
    pub event_name: String,
    /// The aggregated activity records, newest first.
    pub activity_details: Vec<SuspiciousActivity>,
}

/// User record as the gateway sees it.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Global disqualification flag; blocks joins and scoring.
    pub disqualified: bool,
    /// Reason recorded by the disqualifying admin.
    pub disqualified_reason: Option<String>,
    /// When the user was disqualified.
    pub disqualified_at: Option<DateTime<Utc>>,
    /// Admin who disqualified the user.
    pub disqualified_by: Option<UserId>,
}

/// Rank lookup result for a single user within an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRank {
    /// 1-based rank, or `None` when the user is not on the board.
    pub rank: Option<usize>,
    /// The user's total score.
    pub score: i64,
    /// Number of users on the board.
    pub total_players: usize,
}
