//! Security escalation engine.
//!
//! Records suspicious activities, derives their severity from the
//! reason string, aggregates recent pending activities into per-user
//! alerts, and drives the admin dismiss/disqualify workflows. Alert
//! creation is idempotent per (user, event, pending); the disqualify
//! cascade runs as a single transaction in the persistence layer.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::model::{AlertView, SecurityAlert};
use crate::domain::{
    AlertAction, AlertId, AlertStatus, EventBus, EventId, Notice, RoundId, Severity, UserId,
};
use crate::error::ArenaError;
use crate::persistence::PostgresStore;

/// Maps a rejection/report reason to its severity bucket.
///
/// Substring match, so composed reasons like
/// `rate_limit_exceeded:score_update` classify correctly. Unrecognized
/// reasons default to [`Severity::Low`].
#[must_use]
pub fn severity_for_reason(reason: &str) -> Severity {
    const CRITICAL: [&str; 3] = ["devtools", "time_jump", "score_calculation_mismatch"];
    const HIGH: [&str; 3] = ["impossible_score", "excessive_pauses", "rate_limit"];
    const MEDIUM: [&str; 2] = ["long_pause", "statistical"];

    if CRITICAL.iter().any(|k| reason.contains(k)) {
        Severity::Critical
    } else if HIGH.iter().any(|k| reason.contains(k)) {
        Severity::High
    } else if MEDIUM.iter().any(|k| reason.contains(k)) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Orchestration layer for suspicious-activity tracking and alerts.
///
/// Stateless coordinator: owns a [`PostgresStore`] handle for records
/// and an [`EventBus`] for admin/user notices.
#[derive(Debug, Clone)]
pub struct SecurityService {
    store: Arc<PostgresStore>,
    event_bus: EventBus,
    alert_threshold: i64,
    alert_window_mins: i64,
}

impl SecurityService {
    /// Creates a new `SecurityService`.
    #[must_use]
    pub fn new(
        store: Arc<PostgresStore>,
        event_bus: EventBus,
        alert_threshold: i64,
        alert_window_mins: i64,
    ) -> Self {
        Self {
            store,
            event_bus,
            alert_threshold,
            alert_window_mins,
        }
    }

    /// Records a suspicious activity and escalates to an alert when the
    /// user's pending activity count within the rolling window reaches
    /// the threshold.
    ///
    /// The owning event is resolved from the round. Severity comes from
    /// the fixed reason lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::RoundNotFound`] when the round does not
    /// exist, or a persistence error.
    pub async fn log_suspicious_activity(
        &self,
        user_id: UserId,
        round_id: RoundId,
        reason: &str,
        details: &serde_json::Value,
    ) -> Result<(), ArenaError> {
        let round = self.store.get_round(round_id).await?;
        let event_id = round.event_id;
        let severity = severity_for_reason(reason);

        let activity = self
            .store
            .insert_activity(user_id, round_id, event_id, reason, details, severity)
            .await?;

        tracing::warn!(
            %user_id,
            %round_id,
            reason,
            severity = severity.as_str(),
            activity_id = %activity.id,
            "suspicious activity recorded"
        );

        let pending = self
            .store
            .count_pending_activities(user_id, event_id, self.alert_window_mins)
            .await?;

        if pending >= self.alert_threshold {
            self.raise_alert(user_id, event_id, pending).await?;
        }

        Ok(())
    }

    /// Records a client self-report against the user's current playing
    /// round. Reports without a live round are dropped.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn log_self_report(
        &self,
        user_id: UserId,
        reason: &str,
        details: &serde_json::Value,
    ) -> Result<(), ArenaError> {
        let Some(round_id) = self.store.playing_round_of_user(user_id).await? else {
            tracing::debug!(%user_id, reason, "self-report outside a playing round, ignored");
            return Ok(());
        };
        self.log_suspicious_activity(user_id, round_id, reason, details)
            .await
    }

    /// Creates or refreshes the pending alert for (user, event).
    ///
    /// Reuses an existing pending alert, updating its count and activity
    /// list, so repeated escalation within the window yields one row.
    async fn raise_alert(
        &self,
        user_id: UserId,
        event_id: EventId,
        pending_count: i64,
    ) -> Result<(), ArenaError> {
        let activities = self
            .store
            .pending_activity_ids(user_id, event_id, self.alert_window_mins)
            .await?;
        let count = i32::try_from(pending_count).unwrap_or(i32::MAX);

        let alert_id = if let Some(alert_id) = self.store.find_pending_alert(user_id, event_id).await?
        {
            self.store.refresh_alert(alert_id, count, &activities).await?;
            alert_id
        } else {
            let alert = self
                .store
                .insert_alert(user_id, event_id, count, &activities)
                .await?;
            tracing::warn!(alert_id = %alert.id, %user_id, %event_id, count, "security alert raised");
            alert.id
        };

        let _ = self.event_bus.publish(Notice::AlertRaised {
            alert_id,
            user_id,
            event_id,
            activity_count: count,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    /// Dismisses a pending alert: the alert and its activities are
    /// marked `dismissed` with the admin's decision. No effect on the
    /// user or roster.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AlertNotFound`] when the alert does not
    /// exist, or [`ArenaError::InvalidState`] when it is already
    /// resolved.
    pub async fn dismiss_alert(
        &self,
        alert_id: AlertId,
        admin_id: UserId,
        notes: Option<&str>,
    ) -> Result<(), ArenaError> {
        let alert = self.pending_alert(alert_id).await?;
        self.store.dismiss_alert(&alert, admin_id, notes).await?;

        tracing::info!(%alert_id, %admin_id, "alert dismissed");
        let _ = self.event_bus.publish(Notice::AlertResolved {
            alert_id,
            action: AlertAction::Dismissed,
            admin_id,
        });

        Ok(())
    }

    /// Disqualifies the flagged user via the alert: runs the full
    /// cascade (alert + activities resolved, user flagged, roster entry
    /// removed, non-finished participant rows marked) in one
    /// transaction, then notifies the admin topic, the user's own
    /// channel, and the event topic with the shrunk roster.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AlertNotFound`] when the alert does not
    /// exist, or [`ArenaError::InvalidState`] when it is already
    /// resolved.
    pub async fn disqualify_user(
        &self,
        alert_id: AlertId,
        admin_id: UserId,
        reason: &str,
        notes: Option<&str>,
    ) -> Result<(), ArenaError> {
        let alert = self.pending_alert(alert_id).await?;
        self.store
            .disqualify_from_alert(&alert, admin_id, reason, notes)
            .await?;

        tracing::warn!(%alert_id, user_id = %alert.user_id, %admin_id, reason, "user disqualified");

        let _ = self.event_bus.publish(Notice::AlertResolved {
            alert_id,
            action: AlertAction::Disqualified,
            admin_id,
        });
        let _ = self.event_bus.publish(Notice::UserDisqualified {
            user_id: alert.user_id,
            reason: reason.to_string(),
        });

        let participants = self.store.roster(alert.event_id).await?;
        let _ = self.event_bus.publish(Notice::RosterUpdated {
            event_id: alert.event_id,
            participants,
        });

        Ok(())
    }

    /// Lists pending alerts, hydrated with usernames, event names, and
    /// the aggregated activity records, optionally filtered by event.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn pending_alerts(
        &self,
        event_id: Option<EventId>,
    ) -> Result<Vec<AlertView>, ArenaError> {
        let rows = self.store.pending_alerts(event_id).await?;
        let mut views = Vec::with_capacity(rows.len());
        for (alert, username, event_name) in rows {
            let activity_details = self.store.activities_by_ids(&alert.activities).await?;
            views.push(AlertView {
                alert,
                username,
                event_name,
                activity_details,
            });
        }
        Ok(views)
    }

    async fn pending_alert(&self, alert_id: AlertId) -> Result<SecurityAlert, ArenaError> {
        let alert = self.store.get_alert(alert_id).await?;
        if alert.status != AlertStatus::Pending {
            return Err(ArenaError::InvalidState(format!(
                "alert {alert_id} already resolved as {}",
                alert.status.as_str()
            )));
        }
        Ok(alert)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    use serde_json::json;
    use sqlx::PgPool;

    #[test]
    fn devtools_and_time_jumps_are_critical() {
        assert_eq!(severity_for_reason("devtools_opened"), Severity::Critical);
        assert_eq!(
            severity_for_reason("time_jump_detected"),
            Severity::Critical
        );
        assert_eq!(
            severity_for_reason("score_calculation_mismatch"),
            Severity::Critical
        );
    }

    #[test]
    fn impossible_scores_and_rate_limits_are_high() {
        assert_eq!(severity_for_reason("impossible_score"), Severity::High);
        assert_eq!(severity_for_reason("excessive_pauses"), Severity::High);
        assert_eq!(
            severity_for_reason("rate_limit_exceeded:score_update"),
            Severity::High
        );
    }

    #[test]
    fn pauses_and_statistics_are_medium() {
        assert_eq!(severity_for_reason("long_pause"), Severity::Medium);
        assert_eq!(
            severity_for_reason("statistical_anomaly"),
            Severity::Medium
        );
    }

    #[test]
    fn unknown_reasons_default_to_low() {
        assert_eq!(severity_for_reason("negative_score"), Severity::Low);
        assert_eq!(severity_for_reason("something_else"), Severity::Low);
    }

    async fn seed_user(pool: &PgPool, username: &str) -> UserId {
        let id = UserId::new();
        let Ok(_) = sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
            .bind(*id.as_uuid())
            .bind(username)
            .execute(pool)
            .await
        else {
            panic!("failed to seed user {username}");
        };
        id
    }

    #[sqlx::test]
    async fn repeated_escalation_reuses_one_pending_alert(pool: PgPool) {
        let store = Arc::new(PostgresStore::new(pool.clone()));
        let bus = EventBus::new(16);
        let service = SecurityService::new(Arc::clone(&store), bus, 3, 60);

        let admin = seed_user(&pool, "admin").await;
        let player = seed_user(&pool, "player").await;
        let Ok(event) = store.insert_event("midnight cup", admin).await else {
            panic!("failed to insert event");
        };
        let Ok(_) = store.join_roster(event.id, player).await else {
            panic!("failed to join roster");
        };
        let Ok(round) = store.insert_round(event.id, "reaction", admin).await else {
            panic!("failed to insert round");
        };

        for _ in 0..3 {
            let Ok(()) = service
                .log_suspicious_activity(player, round.id, "impossible_score", &json!({}))
                .await
            else {
                panic!("activity log failed");
            };
        }

        let Ok(alerts) = service.pending_alerts(Some(event.id)).await else {
            panic!("alerts read failed");
        };
        assert_eq!(alerts.len(), 1);
        let Some(view) = alerts.first() else {
            panic!("missing alert");
        };
        assert_eq!(view.alert.activity_count, 3);
        assert_eq!(view.activity_details.len(), 3);

        let Ok(()) = service
            .log_suspicious_activity(player, round.id, "time_jump_detected", &json!({}))
            .await
        else {
            panic!("fourth activity failed");
        };

        let Ok(alerts) = service.pending_alerts(Some(event.id)).await else {
            panic!("alerts read failed");
        };
        assert_eq!(alerts.len(), 1);
        let Some(view) = alerts.first() else {
            panic!("missing alert");
        };
        assert_eq!(view.alert.activity_count, 4);
        assert_eq!(view.activity_details.len(), 4);
    }
}
