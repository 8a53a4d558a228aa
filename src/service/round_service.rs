//! Round lifecycle, score ingestion, and the countdown task.
//!
//! Score-update protocol per live message: drop if the round is not
//! `playing`, validate, convert a rejection into a suspicious activity
//! plus an elimination (soft-fail forward), otherwise last-write-wins
//! upsert. Completion additionally cross-checks telemetry-derived
//! counters for game types that support it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::model::{Round, RoundPlayer};
use crate::domain::{
    EventBus, EventId, GameType, Notice, ParticipantStatus, RoundId, RoundStatus, UserId,
};
use crate::error::ArenaError;
use crate::persistence::PostgresStore;
use crate::service::security_service::SecurityService;
use crate::service::validator::{self, Verdict};

/// Flybird awards one point per obstacle passed; completion scores are
/// cross-checked against the obstacle-pass telemetry count.
const FLYBIRD_POINTS_PER_OBSTACLE: i64 = 1;

/// Orchestration layer for round lifecycle and live scoring.
#[derive(Debug, Clone)]
pub struct RoundService {
    store: Arc<PostgresStore>,
    event_bus: EventBus,
    security: SecurityService,
    countdown_secs: u32,
}

impl RoundService {
    /// Creates a new `RoundService`.
    #[must_use]
    pub fn new(
        store: Arc<PostgresStore>,
        event_bus: EventBus,
        security: SecurityService,
        countdown_secs: u32,
    ) -> Self {
        Self {
            store,
            event_bus,
            security,
            countdown_secs,
        }
    }

    /// Creates a round for the event, seeding every roster member as a
    /// `waiting` participant.
    ///
    /// At most one non-finished round may exist per event; creating a
    /// second is rejected instead of silently stacking rounds.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::EventNotFound`] when the event does not
    /// exist, or [`ArenaError::InvalidState`] when the event is finished
    /// or already has an active round.
    pub async fn create_round(
        &self,
        event_id: EventId,
        game_type: GameType,
        actor_id: UserId,
    ) -> Result<Round, ArenaError> {
        let event = self.store.get_event(event_id).await?;
        if !event.status.is_open() {
            return Err(ArenaError::InvalidState(format!(
                "event {event_id} is finished"
            )));
        }
        if let Some(active) = self.store.active_round(event_id).await? {
            return Err(ArenaError::InvalidState(format!(
                "event {event_id} already has active round {}",
                active.id
            )));
        }

        let round = self
            .store
            .insert_round(event_id, game_type.as_str(), actor_id)
            .await?;

        tracing::info!(round_id = %round.id, %event_id, game_type = game_type.as_str(), "round created");
        let _ = self.event_bus.publish(Notice::RoundCreated {
            event_id,
            round_id: round.id,
            game_type,
        });

        Ok(round)
    }

    /// Starts the round: transitions `waiting → countdown` and spawns
    /// the server-authoritative countdown task. Once started, the
    /// countdown runs to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::RoundNotFound`] when the round does not
    /// exist, or [`ArenaError::InvalidState`] when it is not in
    /// `waiting`.
    pub async fn start_round(&self, round_id: RoundId) -> Result<(), ArenaError> {
        let round = self.store.get_round(round_id).await?;
        if !round.status.can_transition_to(RoundStatus::Countdown) {
            return Err(ArenaError::InvalidState(format!(
                "round {round_id} is {}, cannot start",
                round.status.as_str()
            )));
        }

        let moved = self
            .store
            .transition_round(round_id, RoundStatus::Waiting, RoundStatus::Countdown)
            .await?;
        if !moved {
            // Lost a race with another admin action.
            return Err(ArenaError::InvalidState(format!(
                "round {round_id} left waiting concurrently"
            )));
        }

        tracing::info!(%round_id, secs = self.countdown_secs, "countdown started");
        self.spawn_countdown(round_id);
        Ok(())
    }

    /// Spawns the per-second countdown: publishes one tick per second
    /// down to 1, then flips the round to `playing` and announces the
    /// start.
    fn spawn_countdown(&self, round_id: RoundId) {
        let store = Arc::clone(&self.store);
        let event_bus = self.event_bus.clone();
        let secs = self.countdown_secs;

        tokio::spawn(async move {
            for remaining in (1..=secs).rev() {
                let _ = event_bus.publish(Notice::CountdownTick {
                    round_id,
                    remaining,
                });
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }

            match store
                .transition_round(round_id, RoundStatus::Countdown, RoundStatus::Playing)
                .await
            {
                Ok(true) => {
                    tracing::info!(%round_id, "round playing");
                    let _ = event_bus.publish(Notice::RoundStarted {
                        round_id,
                        timestamp: Utc::now(),
                    });
                }
                Ok(false) => {
                    tracing::warn!(%round_id, "round left countdown before start tick");
                }
                Err(error) => {
                    tracing::error!(%round_id, %error, "failed to start round after countdown");
                }
            }
        });
    }

    /// Applies one live score update.
    ///
    /// Updates against a round that is not `playing` are dropped
    /// silently; late and duplicate messages are expected. A validation
    /// failure demotes the participant instead of erroring: suspicious
    /// activity logged, status forced to `eliminated` with score 0, and
    /// the client notified.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Disqualified`] when the user is globally
    /// disqualified, or a persistence error.
    pub async fn update_score(
        &self,
        round_id: RoundId,
        user_id: UserId,
        score: i64,
        metadata: &serde_json::Value,
    ) -> Result<(), ArenaError> {
        let round = self.store.get_round(round_id).await?;
        if round.status != RoundStatus::Playing {
            tracing::debug!(%round_id, %user_id, status = round.status.as_str(), "score update outside playing round dropped");
            return Ok(());
        }

        let user = self.store.get_user(user_id).await?;
        if user.disqualified {
            return Err(ArenaError::Disqualified);
        }

        match validator::validate_score(round.game_type, score, metadata) {
            Verdict::Rejected { reason } => {
                self.eliminate_for_validation(&round, user_id, score, &reason)
                    .await
            }
            Verdict::Accepted => {
                let rows = self
                    .store
                    .update_participant(round_id, user_id, ParticipantStatus::Playing, score, metadata)
                    .await?;
                if rows == 0 {
                    tracing::debug!(%round_id, %user_id, "score update ignored, participant missing or terminal");
                }
                Ok(())
            }
        }
    }

    /// Records a participant's elimination with their final score.
    ///
    /// The final score still passes validation; a rejected score is
    /// escalated and zeroed rather than stored.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn report_elimination(
        &self,
        round_id: RoundId,
        user_id: UserId,
        final_score: i64,
        metadata: &serde_json::Value,
    ) -> Result<(), ArenaError> {
        let round = self.store.get_round(round_id).await?;
        if round.status.is_finished() {
            tracing::debug!(%round_id, %user_id, "elimination after round archive dropped");
            return Ok(());
        }

        if let Verdict::Rejected { reason } =
            validator::validate_score(round.game_type, final_score, metadata)
        {
            return self
                .eliminate_for_validation(&round, user_id, final_score, &reason)
                .await;
        }

        let rows = self
            .store
            .update_participant(
                round_id,
                user_id,
                ParticipantStatus::Eliminated,
                final_score,
                metadata,
            )
            .await?;
        if rows > 0 {
            let _ = self.event_bus.publish(Notice::Eliminated {
                user_id,
                round_id,
                event_id: round.event_id,
            });
            self.broadcast_waiting_count(round_id).await?;
        }
        Ok(())
    }

    /// Records a participant's completion with their final score.
    ///
    /// For game types backed by telemetry counters the final score is
    /// cross-checked against the event stream (10% tolerance); a
    /// mismatch escalates as suspicious and eliminates instead of
    /// finishing.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn report_completion(
        &self,
        round_id: RoundId,
        user_id: UserId,
        final_score: i64,
        metadata: &serde_json::Value,
    ) -> Result<(), ArenaError> {
        let round = self.store.get_round(round_id).await?;
        if round.status.is_finished() {
            tracing::debug!(%round_id, %user_id, "completion after round archive dropped");
            return Ok(());
        }

        if let Verdict::Rejected { reason } =
            validator::validate_score(round.game_type, final_score, metadata)
        {
            return self
                .eliminate_for_validation(&round, user_id, final_score, &reason)
                .await;
        }

        if round.game_type == GameType::Flybird {
            let obstacles = self
                .store
                .count_game_events(round_id, user_id, "obstacle_passed")
                .await?;
            if obstacle_score_mismatch(final_score, obstacles) {
                return self
                    .eliminate_for_validation(&round, user_id, final_score, "score_calculation_mismatch")
                    .await;
            }
        }

        let rows = self
            .store
            .update_participant(
                round_id,
                user_id,
                ParticipantStatus::Finished,
                final_score,
                metadata,
            )
            .await?;
        if rows > 0 {
            let _ = self.event_bus.publish(Notice::Finished {
                user_id,
                round_id,
                event_id: round.event_id,
            });
            self.broadcast_waiting_count(round_id).await?;
        }
        Ok(())
    }

    /// Archives the round: participant scores move to the archive table
    /// and the round flips to `finished` in one transaction, then the
    /// event leaderboard is rebroadcast. Returns the owning event.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::RoundNotFound`] when the round does not
    /// exist or is already finished.
    pub async fn finish_round(&self, round_id: RoundId) -> Result<EventId, ArenaError> {
        let event_id = self.store.finish_round(round_id).await?;
        tracing::info!(%round_id, %event_id, "round finished");

        let _ = self.event_bus.publish(Notice::RoundFinished {
            event_id,
            round_id,
        });

        let entries = self.store.event_leaderboard(event_id).await?;
        let _ = self.event_bus.publish(Notice::LeaderboardUpdated {
            event_id,
            entries,
        });

        Ok(event_id)
    }

    /// Returns round participants in the fixed presentation order.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn round_players(&self, round_id: RoundId) -> Result<Vec<RoundPlayer>, ArenaError> {
        self.store.round_players(round_id).await
    }

    /// Stores one client telemetry event verbatim. Used later for
    /// completion cross-checks only.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn record_game_event(
        &self,
        round_id: RoundId,
        user_id: UserId,
        event_type: &str,
        ts: DateTime<Utc>,
        metadata: &serde_json::Value,
    ) -> Result<(), ArenaError> {
        self.store
            .insert_game_event(round_id, user_id, event_type, ts, metadata)
            .await
    }

    /// Recomputes and broadcasts the round's waiting-room occupancy.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn broadcast_waiting_count(&self, round_id: RoundId) -> Result<(), ArenaError> {
        let players = self.store.round_players(round_id).await?;
        let waiting = players
            .iter()
            .filter(|p| p.status == ParticipantStatus::Waiting)
            .count();
        let _ = self.event_bus.publish(Notice::WaitingCount {
            round_id,
            waiting,
            total: players.len(),
        });
        Ok(())
    }

    /// Soft-fail path: log the rejection as a suspicious activity,
    /// force the participant to `eliminated` with score 0, and notify
    /// the client on their own channel.
    async fn eliminate_for_validation(
        &self,
        round: &Round,
        user_id: UserId,
        submitted_score: i64,
        reason: &str,
    ) -> Result<(), ArenaError> {
        let details = serde_json::json!({
            "submitted_score": submitted_score,
            "game_type": round.game_type.as_str(),
        });
        self.security
            .log_suspicious_activity(user_id, round.id, reason, &details)
            .await?;

        let meta = serde_json::json!({ "reason": "validation_failed" });
        self.store
            .update_participant(round.id, user_id, ParticipantStatus::Eliminated, 0, &meta)
            .await?;

        let _ = self.event_bus.publish(Notice::ValidationFailed {
            user_id,
            round_id: round.id,
            message: format!("score rejected: {reason}"),
        });
        let _ = self.event_bus.publish(Notice::Eliminated {
            user_id,
            round_id: round.id,
            event_id: round.event_id,
        });

        Ok(())
    }
}

/// Returns `true` when a flybird final score deviates from the
/// telemetry-derived expectation by more than 10%. Sessions with no
/// recorded obstacle events are not checked.
#[must_use]
pub fn obstacle_score_mismatch(final_score: i64, obstacles_passed: i64) -> bool {
    if obstacles_passed <= 0 {
        return false;
    }
    let expected = obstacles_passed.saturating_mul(FLYBIRD_POINTS_PER_OBSTACLE);
    let tolerance = expected / 10;
    (final_score - expected).abs() > tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_obstacle_count_passes() {
        assert!(!obstacle_score_mismatch(10, 10));
    }

    #[test]
    fn score_within_tolerance_passes() {
        // 100 obstacles → expected 100, tolerance 10.
        assert!(!obstacle_score_mismatch(110, 100));
        assert!(!obstacle_score_mismatch(90, 100));
    }

    #[test]
    fn score_outside_tolerance_mismatches() {
        assert!(obstacle_score_mismatch(120, 100));
        assert!(obstacle_score_mismatch(12, 10));
        assert!(obstacle_score_mismatch(500, 10));
        assert!(obstacle_score_mismatch(5, 10));
    }

    #[test]
    fn no_telemetry_means_no_check() {
        assert!(!obstacle_score_mismatch(9999, 0));
    }
}
