//! WebSocket connection state machine.
//!
//! Runs the read/write loop for one connection: dispatches inbound
//! commands against the service layer and forwards bus notices whose
//! topic is in the connection's subscription set. Delivery is
//! at-most-once; a lagging client loses the oldest notices and is
//! expected to resync via the pull commands.

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{ClientCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionSet;
use crate::app_state::AppState;
use crate::auth::AuthContext;
use crate::domain::{GameType, Notice, Topic};
use crate::error::ArenaError;

/// Runs the read/write loop for a single authenticated connection.
///
/// Every connection is auto-subscribed to its own user channel; admin
/// connections additionally start on the security feed.
pub async fn run_connection(socket: WebSocket, ctx: AuthContext, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut notice_rx = state.event_bus.subscribe();
    let mut subs = SubscriptionSet::new();

    subs.join(Topic::User {
        user_id: ctx.user_id,
    });
    if ctx.role.is_admin() {
        subs.join(Topic::AdminSecurity);
    }

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &ctx, &state, &mut subs).await;
                        let Ok(json) = serde_json::to_string(&response) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            notice = notice_rx.recv() => {
                match notice {
                    Ok(notice) => {
                        if subs.matches(&notice.topic())
                            && forward_notice(&mut ws_tx, &notice).await.is_err() {
                                break;
                            }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(user_id = %ctx.user_id, lagged = n, "ws client lagged behind notice bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!(user_id = %ctx.user_id, "ws connection closed");
}

/// Wraps a notice in the envelope and sends it.
async fn forward_notice(
    ws_tx: &mut (impl SinkExt<Message> + Unpin),
    notice: &Notice,
) -> Result<(), ()> {
    let msg = WsMessage {
        id: uuid::Uuid::new_v4().to_string(),
        msg_type: WsMessageType::Notice,
        timestamp: Utc::now(),
        payload: serde_json::json!({
            "topic": notice.topic().to_string(),
            "data": notice,
        }),
    };
    let json = serde_json::to_string(&msg).map_err(|_| ())?;
    ws_tx.send(Message::text(json)).await.map_err(|_| ())
}

/// Parses and dispatches one inbound text frame, producing the reply
/// envelope.
async fn handle_text_message(
    text: &str,
    ctx: &AuthContext,
    state: &AppState,
    subs: &mut SubscriptionSet,
) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return error_reply(String::new(), 400, "malformed JSON");
    };

    let command = match serde_json::from_value::<ClientCommand>(msg.payload.clone()) {
        Ok(command) => command,
        Err(e) => return error_reply(msg.id, 400, &format!("unknown command: {e}")),
    };

    if command.is_admin_only() && !ctx.role.is_admin() {
        return error_reply(msg.id, ArenaError::Forbidden.error_code(), "admin role required");
    }

    match dispatch(command, ctx, state, subs).await {
        Ok(payload) => WsMessage {
            id: msg.id,
            msg_type: WsMessageType::Response,
            timestamp: Utc::now(),
            payload,
        },
        Err(error) => error_reply(msg.id, error.error_code(), &error.to_string()),
    }
}

/// Executes one command against the service layer.
#[allow(clippy::too_many_lines)]
async fn dispatch(
    command: ClientCommand,
    ctx: &AuthContext,
    state: &AppState,
    subs: &mut SubscriptionSet,
) -> Result<serde_json::Value, ArenaError> {
    match command {
        ClientCommand::JoinEvent { event_id } => {
            let details = state.events.join_event(event_id, ctx.user_id).await?;
            subs.join(Topic::Event { event_id });
            Ok(serde_json::to_value(&details)?)
        }
        ClientCommand::LeaveEvent { event_id } => {
            state.events.leave_event(event_id, ctx.user_id).await?;
            subs.leave(&Topic::Event { event_id });
            subs.leave(&Topic::Leaderboard { event_id });
            // Leaving the event also leaves its round rooms.
            if let Some(round) = state.events.active_round(event_id).await? {
                subs.leave(&Topic::Round { round_id: round.id });
                subs.leave(&Topic::RoundPlaying { round_id: round.id });
            }
            Ok(serde_json::json!({ "left": event_id }))
        }
        ClientCommand::GetEventDetails { event_id } => {
            let details = state.events.event_details(event_id).await?;
            Ok(serde_json::to_value(&details)?)
        }
        ClientCommand::SubscribeLeaderboard { event_id } => {
            subs.join(Topic::Leaderboard { event_id });
            let entries = state.leaderboards.current_board(event_id).await?;
            Ok(serde_json::json!({ "event_id": event_id, "entries": entries }))
        }
        ClientCommand::GetLeaderboard { event_id } => {
            let entries = state.leaderboards.current_board(event_id).await?;
            Ok(serde_json::json!({ "event_id": event_id, "entries": entries }))
        }
        ClientCommand::GetUserRank { event_id } => {
            let rank = state.leaderboards.user_rank(event_id, ctx.user_id).await?;
            Ok(serde_json::to_value(&rank)?)
        }
        ClientCommand::JoinRound { round_id } => {
            subs.join(Topic::Round { round_id });
            state.rounds.broadcast_waiting_count(round_id).await?;
            let players = state.rounds.round_players(round_id).await?;
            Ok(serde_json::json!({ "round_id": round_id, "players": players }))
        }
        ClientCommand::JoinPlaying { round_id } => {
            subs.join(Topic::Round { round_id });
            subs.join(Topic::RoundPlaying { round_id });
            Ok(serde_json::json!({ "joined": round_id }))
        }
        ClientCommand::GameStart { round_id } => {
            state
                .rounds
                .record_game_event(round_id, ctx.user_id, "game_start", Utc::now(), &serde_json::Value::Null)
                .await?;
            Ok(serde_json::json!({ "recorded": true }))
        }
        ClientCommand::GameEvent {
            round_id,
            event_type,
            timestamp,
            metadata,
        } => {
            state
                .rounds
                .record_game_event(round_id, ctx.user_id, &event_type, timestamp, &metadata)
                .await?;
            Ok(serde_json::json!({ "recorded": true }))
        }
        ClientCommand::ScoreUpdate {
            round_id,
            score,
            metadata,
        } => {
            state
                .rounds
                .update_score(round_id, ctx.user_id, score, &metadata)
                .await?;
            Ok(serde_json::json!({ "accepted": true }))
        }
        ClientCommand::PlayerEliminated {
            round_id,
            final_score,
            metadata,
        } => {
            state
                .rounds
                .report_elimination(round_id, ctx.user_id, final_score, &metadata)
                .await?;
            Ok(serde_json::json!({ "recorded": true }))
        }
        ClientCommand::PlayerFinished {
            round_id,
            final_score,
            metadata,
        } => {
            state
                .rounds
                .report_completion(round_id, ctx.user_id, final_score, &metadata)
                .await?;
            Ok(serde_json::json!({ "recorded": true }))
        }
        ClientCommand::ReportSuspicious { reason, details } => {
            state
                .security
                .log_self_report(ctx.user_id, &reason, &details)
                .await?;
            Ok(serde_json::json!({ "recorded": true }))
        }
        ClientCommand::SubscribeSecurity => {
            subs.join(Topic::AdminSecurity);
            Ok(serde_json::json!({ "subscribed": "admin:security" }))
        }
        ClientCommand::GetPendingAlerts { event_id } => {
            let alerts = state.security.pending_alerts(event_id).await?;
            Ok(serde_json::json!({ "alerts": alerts }))
        }
        ClientCommand::DismissAlert { alert_id, notes } => {
            state
                .security
                .dismiss_alert(alert_id, ctx.user_id, notes.as_deref())
                .await?;
            Ok(serde_json::json!({ "dismissed": alert_id }))
        }
        ClientCommand::DisqualifyUser {
            alert_id,
            reason,
            notes,
        } => {
            state
                .security
                .disqualify_user(alert_id, ctx.user_id, &reason, notes.as_deref())
                .await?;
            Ok(serde_json::json!({ "disqualified": alert_id }))
        }
        ClientCommand::CreateRound {
            event_id,
            game_type,
        } => {
            let game_type = game_type.parse::<GameType>()?;
            let round = state
                .rounds
                .create_round(event_id, game_type, ctx.user_id)
                .await?;
            Ok(serde_json::to_value(&round)?)
        }
        ClientCommand::StartRound { round_id } => {
            state.rounds.start_round(round_id).await?;
            subs.join(Topic::Round { round_id });
            Ok(serde_json::json!({ "started": round_id }))
        }
        ClientCommand::GetRoundPlayers { round_id } => {
            let players = state.rounds.round_players(round_id).await?;
            Ok(serde_json::json!({ "round_id": round_id, "players": players }))
        }
        ClientCommand::FinishRound { round_id } => {
            let event_id = state.rounds.finish_round(round_id).await?;
            Ok(serde_json::json!({ "finished": round_id, "event_id": event_id }))
        }
    }
}

fn error_reply(id: String, code: u32, message: &str) -> WsMessage {
    WsMessage {
        id,
        msg_type: WsMessageType::Error,
        timestamp: Utc::now(),
        payload: serde_json::json!({
            "code": code,
            "message": message,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sqlx::PgPool;

    use crate::auth::Role;
    use crate::domain::{EventBus, UserId};
    use crate::persistence::PostgresStore;
    use crate::service::{EventService, LeaderboardService, RoundService, SecurityService};

    #[derive(Debug)]
    struct NoVerifier;

    impl crate::auth::TokenVerifier for NoVerifier {
        fn verify(&self, _token: &str) -> Result<AuthContext, ArenaError> {
            Err(ArenaError::Unauthorized("not used in tests".to_string()))
        }
    }

    fn app_state(pool: PgPool) -> AppState {
        let store = Arc::new(PostgresStore::new(pool));
        let bus = EventBus::new(64);
        let security = SecurityService::new(Arc::clone(&store), bus.clone(), 3, 60);
        AppState {
            events: EventService::new(Arc::clone(&store), bus.clone()),
            rounds: RoundService::new(Arc::clone(&store), bus.clone(), security.clone(), 1),
            security,
            leaderboards: LeaderboardService::new(Arc::clone(&store)),
            event_bus: bus,
            verifier: Arc::new(NoVerifier),
        }
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
    async fn leaving_an_event_leaves_its_round_rooms(pool: PgPool) {
        let admin = seed_user(&pool, "admin").await;
        let player = seed_user(&pool, "player").await;
        let state = app_state(pool);

        let Ok(event) = state.events.create_event("arcade night", admin).await else {
            panic!("failed to create event");
        };
        let ctx = AuthContext {
            user_id: player,
            username: "player".to_string(),
            role: Role::Player,
        };
        let mut subs = SubscriptionSet::new();

        let Ok(_) = dispatch(
            ClientCommand::JoinEvent { event_id: event.id },
            &ctx,
            &state,
            &mut subs,
        )
        .await
        else {
            panic!("join event failed");
        };

        let Ok(round) = state
            .rounds
            .create_round(event.id, GameType::Reaction, admin)
            .await
        else {
            panic!("failed to create round");
        };
        let Ok(_) = dispatch(
            ClientCommand::JoinRound { round_id: round.id },
            &ctx,
            &state,
            &mut subs,
        )
        .await
        else {
            panic!("join round failed");
        };
        let Ok(_) = dispatch(
            ClientCommand::JoinPlaying { round_id: round.id },
            &ctx,
            &state,
            &mut subs,
        )
        .await
        else {
            panic!("join playing failed");
        };
        assert!(subs.matches(&Topic::Round { round_id: round.id }));
        assert!(subs.matches(&Topic::RoundPlaying { round_id: round.id }));

        let Ok(_) = dispatch(
            ClientCommand::LeaveEvent { event_id: event.id },
            &ctx,
            &state,
            &mut subs,
        )
        .await
        else {
            panic!("leave event failed");
        };
        assert!(!subs.matches(&Topic::Event { event_id: event.id }));
        assert!(!subs.matches(&Topic::Leaderboard { event_id: event.id }));
        assert!(!subs.matches(&Topic::Round { round_id: round.id }));
        assert!(!subs.matches(&Topic::RoundPlaying { round_id: round.id }));
    }
}
