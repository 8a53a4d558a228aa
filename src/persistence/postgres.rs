//! PostgreSQL implementation of the persistence gateway.
//!
//! All access is through parameterized queries against `sqlx::PgPool`.
//! The two multi-statement consistency points — round archival and the
//! disqualification cascade — run inside explicit transactions.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::domain::model::{
    Event, LeaderboardEntry, RosterEntry, Round, RoundPlayer, SecurityAlert, SuspiciousActivity,
    User,
};
use crate::domain::{
    ActivityId, AlertId, AlertStatus, EventId, EventStatus, ParticipantStatus, RoundId,
    RoundStatus, Severity, UserId,
};
use crate::error::ArenaError;

/// Row tuple for `game_rounds` selects.
type RoundRow = (
    Uuid,
    Uuid,
    String,
    String,
    Uuid,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

/// Row tuple for `suspicious_activities` selects.
type ActivityRow = (
    Uuid,
    Uuid,
    Uuid,
    Uuid,
    String,
    serde_json::Value,
    String,
    String,
    DateTime<Utc>,
);

/// Alert row joined with username and event name for the admin feed.
type HydratedAlertRow = (
    Uuid,
    Uuid,
    Uuid,
    i32,
    serde_json::Value,
    String,
    Option<Uuid>,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    String,
    String,
);

/// Row tuple for `security_alerts` selects.
type AlertRow = (
    Uuid,
    Uuid,
    Uuid,
    i32,
    serde_json::Value,
    String,
    Option<Uuid>,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

/// PostgreSQL-backed persistence gateway using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to PostgreSQL with the given pool sizing and runs
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`ArenaError::PersistenceError`] if the connection or a
    /// migration fails.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, ArenaError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ArenaError::PersistenceError(e.to_string()))?;

        Ok(Self::new(pool))
    }

    // ---- users ----

    /// Loads a user by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::UserNotFound`] when the user does not exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, ArenaError> {
        let row = sqlx::query_as::<
            _,
            (
                Uuid,
                String,
                bool,
                Option<String>,
                Option<DateTime<Utc>>,
                Option<Uuid>,
            ),
        >(
            "SELECT id, username, disqualified, disqualified_reason, disqualified_at, \
             disqualified_by FROM users WHERE id = $1",
        )
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ArenaError::UserNotFound(*user_id.as_uuid()))?;

        Ok(User {
            id: UserId::from_uuid(row.0),
            username: row.1,
            disqualified: row.2,
            disqualified_reason: row.3,
            disqualified_at: row.4,
            disqualified_by: row.5.map(UserId::from_uuid),
        })
    }

    // ---- events ----

    /// Inserts a new event in `waiting` status.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn insert_event(&self, name: &str, created_by: UserId) -> Result<Event, ArenaError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, Uuid, DateTime<Utc>)>(
            "INSERT INTO events (name, created_by, status) VALUES ($1, $2, 'waiting') \
             RETURNING id, name, status, created_by, created_at",
        )
        .bind(name)
        .bind(*created_by.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        event_from_row(row)
    }

    /// Sets the event status to `finished`. Idempotent: finishing twice
    /// is a no-op success.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::EventNotFound`] when the event does not exist.
    pub async fn finish_event(&self, event_id: EventId) -> Result<(), ArenaError> {
        let result = sqlx::query("UPDATE events SET status = 'finished' WHERE id = $1")
            .bind(*event_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ArenaError::EventNotFound(*event_id.as_uuid()));
        }
        Ok(())
    }

    /// Loads an event by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::EventNotFound`] when the event does not exist.
    pub async fn get_event(&self, event_id: EventId) -> Result<Event, ArenaError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, Uuid, DateTime<Utc>)>(
            "SELECT id, name, status, created_by, created_at FROM events WHERE id = $1",
        )
        .bind(*event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ArenaError::EventNotFound(*event_id.as_uuid()))?;

        event_from_row(row)
    }

    /// Lists events that are still open (`waiting` or `active`), newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn list_open_events(&self) -> Result<Vec<Event>, ArenaError> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, Uuid, DateTime<Utc>)>(
            "SELECT id, name, status, created_by, created_at FROM events \
             WHERE status IN ('waiting', 'active') ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }

    // ---- roster ----

    /// Adds a user to the event roster if absent.
    ///
    /// Returns `true` when the row was newly inserted, `false` when the
    /// user was already on the roster (re-join is not an error).
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn join_roster(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<bool, ArenaError> {
        let result = sqlx::query(
            "INSERT INTO event_participants (event_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(*event_id.as_uuid())
        .bind(*user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a user from the event roster if present.
    ///
    /// Returns `true` when a row was removed. Leaving without being a
    /// participant is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn leave_roster(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<bool, ArenaError> {
        let result =
            sqlx::query("DELETE FROM event_participants WHERE event_id = $1 AND user_id = $2")
                .bind(*event_id.as_uuid())
                .bind(*user_id.as_uuid())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns the event roster ordered by join time.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn roster(&self, event_id: EventId) -> Result<Vec<RosterEntry>, ArenaError> {
        let rows = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>)>(
            "SELECT u.id, u.username, ep.joined_at \
             FROM event_participants ep \
             JOIN users u ON u.id = ep.user_id \
             WHERE ep.event_id = $1 \
             ORDER BY ep.joined_at",
        )
        .bind(*event_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, username, joined_at)| RosterEntry {
                user_id: UserId::from_uuid(user_id),
                username,
                joined_at,
            })
            .collect())
    }

    // ---- rounds ----

    /// Inserts a round and seeds a `waiting` participant row for every
    /// current roster member, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn insert_round(
        &self,
        event_id: EventId,
        game_type: &str,
        created_by: UserId,
    ) -> Result<Round, ArenaError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RoundRow>(
            "INSERT INTO game_rounds (event_id, game_type, status, created_by) \
             VALUES ($1, $2, 'waiting', $3) \
             RETURNING id, event_id, game_type, status, created_by, created_at, \
                       started_at, finished_at",
        )
        .bind(*event_id.as_uuid())
        .bind(game_type)
        .bind(*created_by.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO round_participants (round_id, user_id, status) \
             SELECT $1, user_id, 'waiting' FROM event_participants WHERE event_id = $2 \
             ON CONFLICT DO NOTHING",
        )
        .bind(row.0)
        .bind(*event_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        round_from_row(row)
    }

    /// Loads a round by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::RoundNotFound`] when the round does not exist.
    pub async fn get_round(&self, round_id: RoundId) -> Result<Round, ArenaError> {
        let row = sqlx::query_as::<_, RoundRow>(
            "SELECT id, event_id, game_type, status, created_by, created_at, \
                    started_at, finished_at \
             FROM game_rounds WHERE id = $1",
        )
        .bind(*round_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ArenaError::RoundNotFound(*round_id.as_uuid()))?;

        round_from_row(row)
    }

    /// Returns the most recent non-finished round of the event, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn active_round(&self, event_id: EventId) -> Result<Option<Round>, ArenaError> {
        let row = sqlx::query_as::<_, RoundRow>(
            "SELECT id, event_id, game_type, status, created_by, created_at, \
                    started_at, finished_at \
             FROM game_rounds \
             WHERE event_id = $1 AND status != 'finished' \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(*event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(round_from_row).transpose()
    }

    /// Returns the `playing` round the user currently participates in,
    /// if any. Used to attach self-reported suspicious activity.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn playing_round_of_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<RoundId>, ArenaError> {
        let row = sqlx::query_as::<_, (Uuid,)>(
            "SELECT gr.id FROM game_rounds gr \
             JOIN round_participants rp ON rp.round_id = gr.id \
             WHERE gr.status = 'playing' AND rp.user_id = $1 \
             ORDER BY gr.created_at DESC LIMIT 1",
        )
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| RoundId::from_uuid(id)))
    }

    /// Moves a round to the given status, guarded by the transition
    /// table: the UPDATE only applies while the round is in `expected`.
    ///
    /// Returns `true` when the row transitioned.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn transition_round(
        &self,
        round_id: RoundId,
        expected: RoundStatus,
        next: RoundStatus,
    ) -> Result<bool, ArenaError> {
        let result = sqlx::query(
            "UPDATE game_rounds \
             SET status = $1, \
                 started_at = CASE WHEN $1 = 'countdown' THEN NOW() ELSE started_at END \
             WHERE id = $2 AND status = $3",
        )
        .bind(next.as_str())
        .bind(*round_id.as_uuid())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Archives a round: copies `finished`/`eliminated` participant rows
    /// with positive scores into `scores`, then flips the round to
    /// `finished`. Both statements run in one transaction so the
    /// leaderboard union never observes the round in both halves.
    ///
    /// Returns the owning event ID for rebroadcast.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::RoundNotFound`] when the round does not
    /// exist or is already finished.
    pub async fn finish_round(&self, round_id: RoundId) -> Result<EventId, ArenaError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO scores (event_id, round_id, user_id, game_type, score, metadata) \
             SELECT gr.event_id, gr.id, rp.user_id, gr.game_type, rp.score, rp.metadata \
             FROM game_rounds gr \
             JOIN round_participants rp ON rp.round_id = gr.id \
             WHERE gr.id = $1 AND rp.status IN ('finished', 'eliminated') AND rp.score > 0",
        )
        .bind(*round_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, (Uuid,)>(
            "UPDATE game_rounds SET status = 'finished', finished_at = NOW() \
             WHERE id = $1 AND status != 'finished' \
             RETURNING event_id",
        )
        .bind(*round_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ArenaError::RoundNotFound(*round_id.as_uuid()))?;

        tx.commit().await?;

        Ok(EventId::from_uuid(row.0))
    }

    // ---- round participants ----

    /// Updates a participant's status/score/metadata, stamping
    /// `eliminated_at`/`finished_at` when the new status warrants it.
    ///
    /// Terminal statuses are guarded in SQL: rows already in `finished`,
    /// `eliminated`, or `disqualified` are never overwritten. Returns the
    /// affected-row count so callers can detect "no matching participant
    /// or already terminal" without an error.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn update_participant(
        &self,
        round_id: RoundId,
        user_id: UserId,
        status: ParticipantStatus,
        score: i64,
        metadata: &serde_json::Value,
    ) -> Result<u64, ArenaError> {
        let result = sqlx::query(
            "UPDATE round_participants \
             SET status = $1, score = $2, metadata = $3, \
                 eliminated_at = CASE WHEN $1 = 'eliminated' THEN NOW() ELSE eliminated_at END, \
                 finished_at = CASE WHEN $1 = 'finished' THEN NOW() ELSE finished_at END \
             WHERE round_id = $4 AND user_id = $5 \
               AND status NOT IN ('finished', 'eliminated', 'disqualified')",
        )
        .bind(status.as_str())
        .bind(score)
        .bind(metadata)
        .bind(*round_id.as_uuid())
        .bind(*user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Returns round participants joined with usernames, ordered by the
    /// fixed status priority (playing, waiting, finished, eliminated,
    /// other) and score descending. Presentation contract only.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn round_players(&self, round_id: RoundId) -> Result<Vec<RoundPlayer>, ArenaError> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, i64, serde_json::Value)>(
            "SELECT rp.user_id, u.username, rp.status, rp.score, rp.metadata \
             FROM round_participants rp \
             JOIN users u ON u.id = rp.user_id \
             WHERE rp.round_id = $1 \
             ORDER BY \
               CASE rp.status \
                 WHEN 'playing' THEN 1 \
                 WHEN 'waiting' THEN 2 \
                 WHEN 'finished' THEN 3 \
                 WHEN 'eliminated' THEN 4 \
                 ELSE 5 \
               END, \
               rp.score DESC",
        )
        .bind(*round_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(user_id, username, status, score, metadata)| {
                Ok(RoundPlayer {
                    user_id: UserId::from_uuid(user_id),
                    username,
                    status: status.parse::<ParticipantStatus>()?,
                    score,
                    metadata,
                })
            })
            .collect()
    }

    // ---- leaderboard ----

    /// Computes the combined event leaderboard: archived scores unioned
    /// with live scores from non-finished rounds, grouped per user,
    /// left-joined against the roster so zero-score participants still
    /// appear, ordered by total score then rounds played.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn event_leaderboard(
        &self,
        event_id: EventId,
    ) -> Result<Vec<LeaderboardEntry>, ArenaError> {
        let rows = sqlx::query_as::<_, (Uuid, String, i64, i64)>(
            "WITH all_scores AS ( \
               SELECT user_id, score FROM scores WHERE event_id = $1 \
               UNION ALL \
               SELECT rp.user_id, rp.score \
               FROM round_participants rp \
               JOIN game_rounds gr ON gr.id = rp.round_id \
               WHERE gr.event_id = $1 AND gr.status != 'finished' AND rp.score > 0 \
             ) \
             SELECT u.id, u.username, \
                    COALESCE(SUM(a.score), 0)::BIGINT AS total_score, \
                    COUNT(a.score)::BIGINT AS rounds_played \
             FROM event_participants ep \
             JOIN users u ON u.id = ep.user_id \
             LEFT JOIN all_scores a ON a.user_id = u.id \
             WHERE ep.event_id = $1 \
             GROUP BY u.id, u.username \
             ORDER BY total_score DESC, rounds_played DESC",
        )
        .bind(*event_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, username, total_score, rounds_played)| LeaderboardEntry {
                user_id: UserId::from_uuid(user_id),
                username,
                total_score,
                rounds_played,
                is_playing: None,
                current_score: None,
            })
            .collect())
    }

    // ---- game telemetry ----

    /// Stores one client telemetry event verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn insert_game_event(
        &self,
        round_id: RoundId,
        user_id: UserId,
        event_type: &str,
        ts: DateTime<Utc>,
        metadata: &serde_json::Value,
    ) -> Result<(), ArenaError> {
        sqlx::query(
            "INSERT INTO game_events (round_id, user_id, event_type, ts, metadata) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*round_id.as_uuid())
        .bind(*user_id.as_uuid())
        .bind(event_type)
        .bind(ts)
        .bind(metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts telemetry events of one type for a (round, user) pair.
    /// Used by the finish-time score cross-check.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn count_game_events(
        &self,
        round_id: RoundId,
        user_id: UserId,
        event_type: &str,
    ) -> Result<i64, ArenaError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM game_events \
             WHERE round_id = $1 AND user_id = $2 AND event_type = $3",
        )
        .bind(*round_id.as_uuid())
        .bind(*user_id.as_uuid())
        .bind(event_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // ---- suspicious activities ----

    /// Inserts a suspicious activity in `pending` status.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn insert_activity(
        &self,
        user_id: UserId,
        round_id: RoundId,
        event_id: EventId,
        reason: &str,
        details: &serde_json::Value,
        severity: Severity,
    ) -> Result<SuspiciousActivity, ArenaError> {
        let row = sqlx::query_as::<_, ActivityRow>(
            "INSERT INTO suspicious_activities \
             (user_id, round_id, event_id, reason, details, severity, status) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending') \
             RETURNING id, user_id, round_id, event_id, reason, details, severity, status, \
                       created_at",
        )
        .bind(*user_id.as_uuid())
        .bind(*round_id.as_uuid())
        .bind(*event_id.as_uuid())
        .bind(reason)
        .bind(details)
        .bind(severity.as_str())
        .fetch_one(&self.pool)
        .await?;

        activity_from_row(row)
    }

    /// Counts a user's pending activities for an event within the
    /// trailing window.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn count_pending_activities(
        &self,
        user_id: UserId,
        event_id: EventId,
        window_mins: i64,
    ) -> Result<i64, ArenaError> {
        let cutoff = Utc::now() - Duration::minutes(window_mins);
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM suspicious_activities \
             WHERE user_id = $1 AND event_id = $2 AND created_at > $3 AND status = 'pending'",
        )
        .bind(*user_id.as_uuid())
        .bind(*event_id.as_uuid())
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Returns IDs of a user's pending activities for an event within
    /// the trailing window, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn pending_activity_ids(
        &self,
        user_id: UserId,
        event_id: EventId,
        window_mins: i64,
    ) -> Result<Vec<ActivityId>, ArenaError> {
        let cutoff = Utc::now() - Duration::minutes(window_mins);
        let rows = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM suspicious_activities \
             WHERE user_id = $1 AND event_id = $2 AND created_at > $3 AND status = 'pending' \
             ORDER BY created_at DESC",
        )
        .bind(*user_id.as_uuid())
        .bind(*event_id.as_uuid())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id,)| ActivityId::from_uuid(id))
            .collect())
    }

    /// Loads activity records by ID, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn activities_by_ids(
        &self,
        ids: &[ActivityId],
    ) -> Result<Vec<SuspiciousActivity>, ArenaError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, user_id, round_id, event_id, reason, details, severity, status, \
                    created_at \
             FROM suspicious_activities WHERE id = ANY($1) ORDER BY created_at DESC",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(activity_from_row).collect()
    }

    // ---- security alerts ----

    /// Finds the pending alert for a (user, event) pair, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn find_pending_alert(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Option<AlertId>, ArenaError> {
        let row = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM security_alerts \
             WHERE user_id = $1 AND event_id = $2 AND status = 'pending'",
        )
        .bind(*user_id.as_uuid())
        .bind(*event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| AlertId::from_uuid(id)))
    }

    /// Refreshes an existing pending alert's count and activity list.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn refresh_alert(
        &self,
        alert_id: AlertId,
        activity_count: i32,
        activities: &[ActivityId],
    ) -> Result<(), ArenaError> {
        let ids = serde_json::to_value(activities)
            .map_err(|e| ArenaError::Internal(e.to_string()))?;
        sqlx::query("UPDATE security_alerts SET activity_count = $1, activities = $2 WHERE id = $3")
            .bind(activity_count)
            .bind(&ids)
            .bind(*alert_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts a new pending alert.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn insert_alert(
        &self,
        user_id: UserId,
        event_id: EventId,
        activity_count: i32,
        activities: &[ActivityId],
    ) -> Result<SecurityAlert, ArenaError> {
        let ids = serde_json::to_value(activities)
            .map_err(|e| ArenaError::Internal(e.to_string()))?;
        let row = sqlx::query_as::<_, AlertRow>(
            "INSERT INTO security_alerts (user_id, event_id, activity_count, activities, status) \
             VALUES ($1, $2, $3, $4, 'pending') \
             RETURNING id, user_id, event_id, activity_count, activities, status, \
                       admin_decision, admin_notes, created_at, resolved_at",
        )
        .bind(*user_id.as_uuid())
        .bind(*event_id.as_uuid())
        .bind(activity_count)
        .bind(&ids)
        .fetch_one(&self.pool)
        .await?;

        alert_from_row(row)
    }

    /// Loads an alert by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AlertNotFound`] when the alert does not exist.
    pub async fn get_alert(&self, alert_id: AlertId) -> Result<SecurityAlert, ArenaError> {
        let row = sqlx::query_as::<_, AlertRow>(
            "SELECT id, user_id, event_id, activity_count, activities, status, \
                    admin_decision, admin_notes, created_at, resolved_at \
             FROM security_alerts WHERE id = $1",
        )
        .bind(*alert_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ArenaError::AlertNotFound(*alert_id.as_uuid()))?;

        alert_from_row(row)
    }

    /// Lists pending alerts joined with username and event name, newest
    /// first, optionally filtered by event.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn pending_alerts(
        &self,
        event_id: Option<EventId>,
    ) -> Result<Vec<(SecurityAlert, String, String)>, ArenaError> {
        let rows = if let Some(event_id) = event_id {
            sqlx::query_as::<_, HydratedAlertRow>(
                "SELECT sa.id, sa.user_id, sa.event_id, sa.activity_count, sa.activities, \
                        sa.status, sa.admin_decision, sa.admin_notes, sa.created_at, \
                        sa.resolved_at, u.username, e.name \
                 FROM security_alerts sa \
                 JOIN users u ON u.id = sa.user_id \
                 JOIN events e ON e.id = sa.event_id \
                 WHERE sa.status = 'pending' AND sa.event_id = $1 \
                 ORDER BY sa.created_at DESC",
            )
            .bind(*event_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, HydratedAlertRow>(
                "SELECT sa.id, sa.user_id, sa.event_id, sa.activity_count, sa.activities, \
                        sa.status, sa.admin_decision, sa.admin_notes, sa.created_at, \
                        sa.resolved_at, u.username, e.name \
                 FROM security_alerts sa \
                 JOIN users u ON u.id = sa.user_id \
                 JOIN events e ON e.id = sa.event_id \
                 WHERE sa.status = 'pending' \
                 ORDER BY sa.created_at DESC",
            )
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter()
            .map(|(a, b, c, d, e, f, g, h, i, j, username, event_name)| {
                Ok((
                    alert_from_row((a, b, c, d, e, f, g, h, i, j))?,
                    username,
                    event_name,
                ))
            })
            .collect()
    }

    /// Dismisses an alert: marks the alert and all referenced activities
    /// `dismissed` with the admin's decision, in one transaction. No
    /// effect on user or roster state.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure.
    pub async fn dismiss_alert(
        &self,
        alert: &SecurityAlert,
        admin_id: UserId,
        notes: Option<&str>,
    ) -> Result<(), ArenaError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE security_alerts \
             SET status = 'dismissed', admin_decision = $1, admin_notes = $2, resolved_at = NOW() \
             WHERE id = $3",
        )
        .bind(*admin_id.as_uuid())
        .bind(notes)
        .bind(*alert.id.as_uuid())
        .execute(&mut *tx)
        .await?;

        let ids: Vec<Uuid> = alert.activities.iter().map(|id| *id.as_uuid()).collect();
        if !ids.is_empty() {
            sqlx::query(
                "UPDATE suspicious_activities \
                 SET status = 'dismissed', admin_decision = $1, admin_notes = $2 \
                 WHERE id = ANY($3)",
            )
            .bind(*admin_id.as_uuid())
            .bind(notes.unwrap_or("dismissed with alert"))
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Applies the full disqualification cascade in one transaction:
    /// resolve the alert and its activities as `disqualified`, set the
    /// user's global flag with audit fields, remove the event roster
    /// entry, and mark every participant row of the user in non-finished
    /// rounds of the event as `disqualified`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::PersistenceError`] on database failure; no
    /// partial application survives a failure.
    pub async fn disqualify_from_alert(
        &self,
        alert: &SecurityAlert,
        admin_id: UserId,
        reason: &str,
        notes: Option<&str>,
    ) -> Result<(), ArenaError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE users \
             SET disqualified = TRUE, disqualified_reason = $1, disqualified_at = NOW(), \
                 disqualified_by = $2 \
             WHERE id = $3",
        )
        .bind(reason)
        .bind(*admin_id.as_uuid())
        .bind(*alert.user_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE security_alerts \
             SET status = 'disqualified', admin_decision = $1, admin_notes = $2, \
                 resolved_at = NOW() \
             WHERE id = $3",
        )
        .bind(*admin_id.as_uuid())
        .bind(notes)
        .bind(*alert.id.as_uuid())
        .execute(&mut *tx)
        .await?;

        let ids: Vec<Uuid> = alert.activities.iter().map(|id| *id.as_uuid()).collect();
        if !ids.is_empty() {
            sqlx::query(
                "UPDATE suspicious_activities \
                 SET status = 'disqualified', admin_decision = $1, admin_notes = $2 \
                 WHERE id = ANY($3)",
            )
            .bind(*admin_id.as_uuid())
            .bind(reason)
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM event_participants WHERE event_id = $1 AND user_id = $2")
            .bind(*alert.event_id.as_uuid())
            .bind(*alert.user_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE round_participants SET status = 'disqualified' \
             WHERE user_id = $1 AND round_id IN ( \
               SELECT id FROM game_rounds WHERE event_id = $2 AND status != 'finished' \
             )",
        )
        .bind(*alert.user_id.as_uuid())
        .bind(*alert.event_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn event_from_row(row: (Uuid, String, String, Uuid, DateTime<Utc>)) -> Result<Event, ArenaError> {
    Ok(Event {
        id: EventId::from_uuid(row.0),
        name: row.1,
        status: row.2.parse::<EventStatus>()?,
        created_by: UserId::from_uuid(row.3),
        created_at: row.4,
    })
}

fn round_from_row(row: RoundRow) -> Result<Round, ArenaError> {
    Ok(Round {
        id: RoundId::from_uuid(row.0),
        event_id: EventId::from_uuid(row.1),
        game_type: row.2.parse()?,
        status: row.3.parse::<RoundStatus>()?,
        created_by: UserId::from_uuid(row.4),
        created_at: row.5,
        started_at: row.6,
        finished_at: row.7,
    })
}

fn activity_from_row(row: ActivityRow) -> Result<SuspiciousActivity, ArenaError> {
    Ok(SuspiciousActivity {
        id: ActivityId::from_uuid(row.0),
        user_id: UserId::from_uuid(row.1),
        round_id: RoundId::from_uuid(row.2),
        event_id: EventId::from_uuid(row.3),
        reason: row.4,
        details: row.5,
        severity: row.6.parse::<Severity>()?,
        status: row.7.parse::<AlertStatus>()?,
        created_at: row.8,
    })
}

fn alert_from_row(row: AlertRow) -> Result<SecurityAlert, ArenaError> {
    let activities: Vec<ActivityId> =
        serde_json::from_value(row.4).map_err(|e| ArenaError::Internal(e.to_string()))?;
    Ok(SecurityAlert {
        id: AlertId::from_uuid(row.0),
        user_id: UserId::from_uuid(row.1),
        event_id: EventId::from_uuid(row.2),
        activity_count: row.3,
        activities,
        status: row.5.parse::<AlertStatus>()?,
        admin_decision: row.6.map(UserId::from_uuid),
        admin_notes: row.7,
        created_at: row.8,
        resolved_at: row.9,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

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

    /// Admin-created event with one roster member and one waiting round.
    async fn seed_round(
        store: &PostgresStore,
        pool: &PgPool,
    ) -> (EventId, RoundId, UserId, UserId) {
        let admin = seed_user(pool, "admin").await;
        let player = seed_user(pool, "player").await;
        let Ok(event) = store.insert_event("friday night cup", admin).await else {
            panic!("failed to insert event");
        };
        let Ok(joined) = store.join_roster(event.id, player).await else {
            panic!("failed to join roster");
        };
        assert!(joined);
        let Ok(round) = store.insert_round(event.id, "flybird", admin).await else {
            panic!("failed to insert round");
        };
        (event.id, round.id, admin, player)
    }

    #[sqlx::test]
    async fn roster_joins_are_idempotent(pool: PgPool) {
        let store = PostgresStore::new(pool.clone());
        let admin = seed_user(&pool, "admin").await;
        let player = seed_user(&pool, "player").await;
        let Ok(event) = store.insert_event("open qualifier", admin).await else {
            panic!("failed to insert event");
        };

        let Ok(first) = store.join_roster(event.id, player).await else {
            panic!("first join failed");
        };
        assert!(first);
        let Ok(second) = store.join_roster(event.id, player).await else {
            panic!("second join failed");
        };
        assert!(!second);

        let Ok(roster) = store.roster(event.id).await else {
            panic!("roster read failed");
        };
        assert_eq!(roster.len(), 1);

        // Leaving without being a participant reports "not removed".
        let Ok(removed) = store.leave_roster(event.id, admin).await else {
            panic!("leave failed");
        };
        assert!(!removed);
    }

    #[sqlx::test]
    async fn terminal_participant_rows_reject_further_mutation(pool: PgPool) {
        let store = PostgresStore::new(pool.clone());
        let (_event_id, round_id, _admin, player) = seed_round(&store, &pool).await;
        let meta = serde_json::json!({});

        let Ok(rows) = store
            .update_participant(round_id, player, ParticipantStatus::Playing, 30, &meta)
            .await
        else {
            panic!("live update failed");
        };
        assert_eq!(rows, 1);

        let Ok(rows) = store
            .update_participant(round_id, player, ParticipantStatus::Finished, 30, &meta)
            .await
        else {
            panic!("finishing update failed");
        };
        assert_eq!(rows, 1);

        // A late write against the finished row must not land.
        let Ok(rows) = store
            .update_participant(round_id, player, ParticipantStatus::Playing, 500, &meta)
            .await
        else {
            panic!("late update errored");
        };
        assert_eq!(rows, 0);

        let Ok(players) = store.round_players(round_id).await else {
            panic!("round players read failed");
        };
        let row = players.iter().find(|p| p.user_id == player);
        assert_eq!(row.map(|p| p.status), Some(ParticipantStatus::Finished));
        assert_eq!(row.map(|p| p.score), Some(30));
    }

    #[sqlx::test]
    async fn archiving_a_round_never_double_counts_scores(pool: PgPool) {
        let store = PostgresStore::new(pool.clone());
        let (event_id, round_id, _admin, player) = seed_round(&store, &pool).await;
        let meta = serde_json::json!({});

        let Ok(rows) = store
            .update_participant(round_id, player, ParticipantStatus::Finished, 40, &meta)
            .await
        else {
            panic!("finishing update failed");
        };
        assert_eq!(rows, 1);

        let Ok(before) = store.event_leaderboard(event_id).await else {
            panic!("leaderboard read failed");
        };
        let live = before.iter().find(|e| e.user_id == player);
        assert_eq!(live.map(|e| e.total_score), Some(40));
        assert_eq!(live.map(|e| e.rounds_played), Some(1));

        let Ok(owner) = store.finish_round(round_id).await else {
            panic!("finish round failed");
        };
        assert_eq!(owner, event_id);

        // Same totals after archival: the score moved, it did not add up.
        let Ok(after) = store.event_leaderboard(event_id).await else {
            panic!("leaderboard read failed");
        };
        let archived = after.iter().find(|e| e.user_id == player);
        assert_eq!(archived.map(|e| e.total_score), Some(40));
        assert_eq!(archived.map(|e| e.rounds_played), Some(1));
    }

    #[sqlx::test]
    async fn disqualification_cascade_applies_every_postcondition(pool: PgPool) {
        let store = PostgresStore::new(pool.clone());
        let (event_id, round_id, admin, player) = seed_round(&store, &pool).await;

        let Ok(activity) = store
            .insert_activity(
                player,
                round_id,
                event_id,
                "impossible_score",
                &serde_json::json!({}),
                Severity::High,
            )
            .await
        else {
            panic!("insert activity failed");
        };
        let Ok(alert) = store
            .insert_alert(player, event_id, 3, &[activity.id])
            .await
        else {
            panic!("insert alert failed");
        };

        let Ok(()) = store
            .disqualify_from_alert(&alert, admin, "score manipulation", Some("reviewed"))
            .await
        else {
            panic!("cascade failed");
        };

        let Ok(user) = store.get_user(player).await else {
            panic!("user read failed");
        };
        assert!(user.disqualified);
        assert_eq!(user.disqualified_by, Some(admin));
        assert_eq!(user.disqualified_reason.as_deref(), Some("score manipulation"));

        let Ok(roster) = store.roster(event_id).await else {
            panic!("roster read failed");
        };
        assert!(roster.iter().all(|r| r.user_id != player));

        let Ok(players) = store.round_players(round_id).await else {
            panic!("round players read failed");
        };
        assert_eq!(
            players.iter().find(|p| p.user_id == player).map(|p| p.status),
            Some(ParticipantStatus::Disqualified)
        );

        let Ok(resolved) = store.get_alert(alert.id).await else {
            panic!("alert read failed");
        };
        assert_eq!(resolved.status, AlertStatus::Disqualified);
        assert_eq!(resolved.admin_decision, Some(admin));

        let Ok(activities) = store.activities_by_ids(&alert.activities).await else {
            panic!("activities read failed");
        };
        assert!(!activities.is_empty());
        assert!(activities.iter().all(|a| a.status == AlertStatus::Disqualified));
    }
}
