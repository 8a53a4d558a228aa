//! WebSocket message types: envelope and client commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AlertId, EventId, RoundId};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for pushes.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client topic push.
    Notice,
    /// Server → Client error.
    Error,
}

/// Commands a client can send over WebSocket.
///
/// Parsed from the envelope payload. Commands past the admin marker
/// require `role = admin`; the dispatcher rejects them on player
/// connections.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Join an event roster and subscribe to its topic.
    JoinEvent {
        /// Target event.
        event_id: EventId,
    },
    /// Leave an event roster and its topic.
    LeaveEvent {
        /// Target event.
        event_id: EventId,
    },
    /// Fetch the event details aggregate (pull-based resync).
    GetEventDetails {
        /// Target event.
        event_id: EventId,
    },
    /// Subscribe to periodic leaderboard pushes for an event.
    SubscribeLeaderboard {
        /// Target event.
        event_id: EventId,
    },
    /// Fetch the current leaderboard once (pull-based resync).
    GetLeaderboard {
        /// Target event.
        event_id: EventId,
    },
    /// Fetch the caller's rank within an event.
    GetUserRank {
        /// Target event.
        event_id: EventId,
    },
    /// Join a round's waiting room.
    JoinRound {
        /// Target round.
        round_id: RoundId,
    },
    /// Join a round's playing sub-room.
    JoinPlaying {
        /// Target round.
        round_id: RoundId,
    },
    /// Mark the start of local gameplay; stored as telemetry.
    GameStart {
        /// Target round.
        round_id: RoundId,
    },
    /// Arbitrary game telemetry event, stored verbatim.
    GameEvent {
        /// Target round.
        round_id: RoundId,
        /// Client-defined event type (e.g. `obstacle_passed`).
        event_type: String,
        /// Client-side timestamp of the event.
        timestamp: DateTime<Utc>,
        /// Opaque context.
        #[serde(default)]
        metadata: serde_json::Value,
    },
    /// Live score update.
    ScoreUpdate {
        /// Target round.
        round_id: RoundId,
        /// Current score.
        score: i64,
        /// Opaque context stored with the participant row.
        #[serde(default)]
        metadata: serde_json::Value,
    },
    /// Self-reported elimination with final score.
    PlayerEliminated {
        /// Target round.
        round_id: RoundId,
        /// Final score at elimination.
        final_score: i64,
        /// Opaque context.
        #[serde(default)]
        metadata: serde_json::Value,
    },
    /// Self-reported completion with final score.
    PlayerFinished {
        /// Target round.
        round_id: RoundId,
        /// Final score at completion.
        final_score: i64,
        /// Opaque context.
        #[serde(default)]
        metadata: serde_json::Value,
    },
    /// Client self-report of anomalous behavior (attached to the
    /// caller's current playing round).
    ReportSuspicious {
        /// Machine-readable reason.
        reason: String,
        /// Context captured by the client.
        #[serde(default)]
        details: serde_json::Value,
    },

    // ---- admin commands ----
    /// Subscribe to the security alert feed. Admin only.
    SubscribeSecurity,
    /// Fetch pending alerts, optionally filtered by event. Admin only.
    GetPendingAlerts {
        /// Optional event filter.
        #[serde(default)]
        event_id: Option<EventId>,
    },
    /// Dismiss a pending alert. Admin only.
    DismissAlert {
        /// Target alert.
        alert_id: AlertId,
        /// Free-form notes.
        #[serde(default)]
        notes: Option<String>,
    },
    /// Disqualify the flagged user via a pending alert. Admin only.
    DisqualifyUser {
        /// Target alert.
        alert_id: AlertId,
        /// Reason recorded on the user.
        reason: String,
        /// Free-form notes.
        #[serde(default)]
        notes: Option<String>,
    },
    /// Create a round for an event. Admin only.
    CreateRound {
        /// Target event.
        event_id: EventId,
        /// Game type, e.g. `flybird`.
        game_type: String,
    },
    /// Start a round's countdown. Admin only.
    StartRound {
        /// Target round.
        round_id: RoundId,
    },
    /// Fetch round participants in presentation order. Admin only.
    GetRoundPlayers {
        /// Target round.
        round_id: RoundId,
    },
    /// Archive a round. Admin only.
    FinishRound {
        /// Target round.
        round_id: RoundId,
    },
}

impl ClientCommand {
    /// Returns `true` for commands that require an admin connection.
    #[must_use]
    pub const fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::SubscribeSecurity
                | Self::GetPendingAlerts { .. }
                | Self::DismissAlert { .. }
                | Self::DisqualifyUser { .. }
                | Self::CreateRound { .. }
                | Self::StartRound { .. }
                | Self::GetRoundPlayers { .. }
                | Self::FinishRound { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_score_update_command() {
        let round_id = RoundId::new();
        let json = serde_json::json!({
            "command": "score_update",
            "round_id": round_id,
            "score": 42,
        });
        let cmd = serde_json::from_value::<ClientCommand>(json);
        let Ok(ClientCommand::ScoreUpdate {
            round_id: parsed,
            score,
            metadata,
        }) = cmd
        else {
            panic!("expected score_update");
        };
        assert_eq!(parsed, round_id);
        assert_eq!(score, 42);
        assert_eq!(metadata, serde_json::Value::Null);
    }

    #[test]
    fn admin_only_flags() {
        let cmd = ClientCommand::StartRound {
            round_id: RoundId::new(),
        };
        assert!(cmd.is_admin_only());

        let cmd = ClientCommand::JoinEvent {
            event_id: EventId::new(),
        };
        assert!(!cmd.is_admin_only());
    }

    #[test]
    fn envelope_round_trips() {
        let msg = WsMessage {
            id: "req-1".to_string(),
            msg_type: WsMessageType::Command,
            timestamp: Utc::now(),
            payload: serde_json::json!({"command": "subscribe_security"}),
        };
        let json = serde_json::to_string(&msg).unwrap_or_default();
        assert!(json.contains("\"type\":\"command\""));
        let back = serde_json::from_str::<WsMessage>(&json);
        assert!(back.is_ok());
    }
}
