//! Leaderboard aggregation and decoration.
//!
//! The ranked board itself is computed in SQL (archived scores unioned
//! with live scores from non-finished rounds, see
//! [`PostgresStore::event_leaderboard`]). This service adds the live
//! decoration for a `playing` round and per-user rank lookups.

use std::sync::Arc;

use crate::domain::model::{LeaderboardEntry, RoundPlayer, UserRank};
use crate::domain::{EventId, ParticipantStatus, RoundId, RoundStatus, UserId};
use crate::error::ArenaError;
use crate::persistence::PostgresStore;

/// Read-side aggregator over archived and live scores.
#[derive(Debug, Clone)]
pub struct LeaderboardService {
    store: Arc<PostgresStore>,
}

impl LeaderboardService {
    /// Creates a new `LeaderboardService`.
    #[must_use]
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }

    /// Returns the combined event leaderboard without live decoration.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn leaderboard(&self, event_id: EventId) -> Result<Vec<LeaderboardEntry>, ArenaError> {
        self.store.event_leaderboard(event_id).await
    }

    /// Returns the leaderboard decorated with `is_playing`/`current_score`
    /// from the given round's live participant rows.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn decorated_leaderboard(
        &self,
        event_id: EventId,
        active_round_id: RoundId,
    ) -> Result<Vec<LeaderboardEntry>, ArenaError> {
        let entries = self.store.event_leaderboard(event_id).await?;
        let players = self.store.round_players(active_round_id).await?;
        Ok(decorate(entries, &players))
    }

    /// Returns the current board for the event, decorated when the
    /// event has a `playing` round. This is the view the periodic
    /// broadcast pushes.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn current_board(
        &self,
        event_id: EventId,
    ) -> Result<Vec<LeaderboardEntry>, ArenaError> {
        match self.store.active_round(event_id).await? {
            Some(round) if round.status == RoundStatus::Playing => {
                self.decorated_leaderboard(event_id, round.id).await
            }
            _ => self.leaderboard(event_id).await,
        }
    }

    /// Looks up one user's 1-based rank within the event board.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn user_rank(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<UserRank, ArenaError> {
        let entries = self.store.event_leaderboard(event_id).await?;
        let total_players = entries.len();
        let found = entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.user_id == user_id);

        Ok(match found {
            Some((index, entry)) => UserRank {
                rank: Some(index + 1),
                score: entry.total_score,
                total_players,
            },
            None => UserRank {
                rank: None,
                score: 0,
                total_players,
            },
        })
    }
}

/// Decorates leaderboard entries with live-play status from a round's
/// participant rows. Entries without a matching row are untouched.
#[must_use]
pub fn decorate(
    mut entries: Vec<LeaderboardEntry>,
    players: &[RoundPlayer],
) -> Vec<LeaderboardEntry> {
    for entry in &mut entries {
        if let Some(player) = players.iter().find(|p| p.user_id == entry.user_id) {
            entry.is_playing = Some(player.status == ParticipantStatus::Playing);
            entry.current_score = Some(player.score);
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(user_id: UserId, total_score: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id,
            username: "player".to_string(),
            total_score,
            rounds_played: 1,
            is_playing: None,
            current_score: None,
        }
    }

    fn player(user_id: UserId, status: ParticipantStatus, score: i64) -> RoundPlayer {
        RoundPlayer {
            user_id,
            username: "player".to_string(),
            status,
            score,
            metadata: json!({}),
        }
    }

    #[test]
    fn decorate_marks_playing_participants() {
        let alice = UserId::new();
        let bob = UserId::new();
        let entries = vec![entry(alice, 100), entry(bob, 80)];
        let players = vec![player(alice, ParticipantStatus::Playing, 42)];

        let decorated = decorate(entries, &players);

        let alice_row = decorated.iter().find(|e| e.user_id == alice);
        assert_eq!(
            alice_row.and_then(|e| e.is_playing),
            Some(true),
            "alice should be marked playing"
        );
        assert_eq!(alice_row.and_then(|e| e.current_score), Some(42));

        let bob_row = decorated.iter().find(|e| e.user_id == bob);
        assert_eq!(bob_row.and_then(|e| e.is_playing), None);
        assert_eq!(bob_row.and_then(|e| e.current_score), None);
    }

    #[test]
    fn decorate_treats_eliminated_as_not_playing() {
        let alice = UserId::new();
        let entries = vec![entry(alice, 10)];
        let players = vec![player(alice, ParticipantStatus::Eliminated, 0)];

        let decorated = decorate(entries, &players);
        assert_eq!(
            decorated.first().and_then(|e| e.is_playing),
            Some(false)
        );
    }
}
