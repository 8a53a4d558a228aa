//! Event lifecycle and roster management.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::model::{Event, EventDetails, RosterEntry, Round};
use crate::domain::{EventBus, EventId, Notice, UserId};
use crate::error::ArenaError;
use crate::persistence::PostgresStore;

/// Orchestration layer for event lifecycle and roster operations.
///
/// Stateless coordinator: every mutation follows the pattern
/// check preconditions → persist → publish notices → return result.
#[derive(Debug, Clone)]
pub struct EventService {
    store: Arc<PostgresStore>,
    event_bus: EventBus,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(store: Arc<PostgresStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Creates a new event in `waiting` status.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn create_event(&self, name: &str, actor_id: UserId) -> Result<Event, ArenaError> {
        let event = self.store.insert_event(name, actor_id).await?;
        tracing::info!(event_id = %event.id, name, "event created");
        Ok(event)
    }

    /// Finishes an event. Idempotent: finishing twice is a no-op
    /// success.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::EventNotFound`] when the event does not
    /// exist.
    pub async fn finish_event(&self, event_id: EventId) -> Result<(), ArenaError> {
        self.store.finish_event(event_id).await?;
        tracing::info!(%event_id, "event finished");
        Ok(())
    }

    /// Adds a user to the event roster.
    ///
    /// Insert-or-ignore: joining twice is not an error and publishes no
    /// duplicate join notice, but every call re-broadcasts the roster so
    /// a reconnecting client resyncs. Returns the full event details
    /// aggregate for the joining client.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Disqualified`] when the user is globally
    /// disqualified, [`ArenaError::EventNotFound`] when the event does
    /// not exist, or [`ArenaError::InvalidState`] when the event is
    /// finished.
    pub async fn join_event(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<EventDetails, ArenaError> {
        let user = self.store.get_user(user_id).await?;
        if user.disqualified {
            return Err(ArenaError::Disqualified);
        }

        let event = self.store.get_event(event_id).await?;
        if !event.status.is_open() {
            return Err(ArenaError::InvalidState(format!(
                "event {event_id} is finished"
            )));
        }

        let was_new = self.store.join_roster(event_id, user_id).await?;
        if was_new {
            tracing::info!(%event_id, %user_id, "participant joined");
            let _ = self.event_bus.publish(Notice::ParticipantJoined {
                event_id,
                user_id,
                username: user.username,
                timestamp: Utc::now(),
            });
        }

        let participants = self.broadcast_roster(event_id).await?;
        self.details_with_roster(event, participants).await
    }

    /// Removes a user from the event roster.
    ///
    /// Leaving without being a participant is a successful no-op and
    /// publishes no leave notice, but the roster is re-broadcast either
    /// way so clients resync.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::UserNotFound`] when the user does not
    /// exist, or a persistence error.
    pub async fn leave_event(&self, event_id: EventId, user_id: UserId) -> Result<(), ArenaError> {
        let removed = self.store.leave_roster(event_id, user_id).await?;
        if removed {
            let user = self.store.get_user(user_id).await?;
            tracing::info!(%event_id, %user_id, "participant left");
            let _ = self.event_bus.publish(Notice::ParticipantLeft {
                event_id,
                user_id,
                username: user.username,
                timestamp: Utc::now(),
            });
        }
        self.broadcast_roster(event_id).await?;
        Ok(())
    }

    /// Returns the event details aggregate: event, roster, leaderboard,
    /// and the active round if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::EventNotFound`] when the event does not
    /// exist.
    pub async fn event_details(&self, event_id: EventId) -> Result<EventDetails, ArenaError> {
        let event = self.store.get_event(event_id).await?;
        let participants = self.store.roster(event_id).await?;
        self.details_with_roster(event, participants).await
    }

    /// Returns the event's most recent non-finished round, if any.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn active_round(&self, event_id: EventId) -> Result<Option<Round>, ArenaError> {
        self.store.active_round(event_id).await
    }

    /// Lists events that are still open, newest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn list_open_events(&self) -> Result<Vec<Event>, ArenaError> {
        self.store.list_open_events().await
    }

    async fn details_with_roster(
        &self,
        event: Event,
        participants: Vec<RosterEntry>,
    ) -> Result<EventDetails, ArenaError> {
        let leaderboard = self.store.event_leaderboard(event.id).await?;
        let active_round = self.store.active_round(event.id).await?;
        Ok(EventDetails {
            event,
            participants,
            leaderboard,
            active_round,
        })
    }

    async fn broadcast_roster(&self, event_id: EventId) -> Result<Vec<RosterEntry>, ArenaError> {
        let participants = self.store.roster(event_id).await?;
        let _ = self.event_bus.publish(Notice::RosterUpdated {
            event_id,
            participants: participants.clone(),
        });
        Ok(participants)
    }
}
