//! Round handlers: admin lifecycle operations over REST.
//!
//! These mirror the admin WebSocket commands so tooling without a
//! socket can drive rounds.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::{authenticate, require_admin};
use crate::api::dto::CreateRoundRequest;
use crate::app_state::AppState;
use crate::domain::{EventId, GameType, RoundId};
use crate::error::{ArenaError, ErrorResponse};

/// `POST /events/:id/rounds` — Create a round. Admin only.
///
/// # Errors
///
/// Returns [`ArenaError::InvalidState`] when the event already has an
/// active round.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/rounds",
    tag = "Rounds",
    summary = "Create a round",
    description = "Creates a round for the event and seeds every roster member as a waiting participant. At most one non-finished round may exist per event.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    request_body = CreateRoundRequest,
    responses(
        (status = 201, description = "Round created", body = serde_json::Value),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Active round already exists", body = ErrorResponse),
    )
)]
pub async fn create_round(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<CreateRoundRequest>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx)?;

    let game_type = req.game_type.parse::<GameType>()?;
    let round = state
        .rounds
        .create_round(EventId::from_uuid(id), game_type, ctx.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(round)))
}

/// `POST /rounds/:id/start` — Start a round's countdown. Admin only.
///
/// # Errors
///
/// Returns [`ArenaError::InvalidState`] when the round is not waiting.
#[utoipa::path(
    post,
    path = "/api/v1/rounds/{id}/start",
    tag = "Rounds",
    summary = "Start a round",
    description = "Moves the round to countdown and runs the server-timed ticks; the round flips to playing at zero.",
    params(
        ("id" = uuid::Uuid, Path, description = "Round UUID"),
    ),
    responses(
        (status = 202, description = "Countdown started"),
        (status = 404, description = "Round not found", body = ErrorResponse),
        (status = 409, description = "Round not in waiting", body = ErrorResponse),
    )
)]
pub async fn start_round(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx)?;

    state.rounds.start_round(RoundId::from_uuid(id)).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `GET /rounds/:id/players` — Round participants. Admin only.
///
/// # Errors
///
/// Returns [`ArenaError::RoundNotFound`] if the round does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/rounds/{id}/players",
    tag = "Rounds",
    summary = "Get round players",
    description = "Returns participants ordered by status priority then score descending.",
    params(
        ("id" = uuid::Uuid, Path, description = "Round UUID"),
    ),
    responses(
        (status = 200, description = "Round participants", body = serde_json::Value),
        (status = 404, description = "Round not found", body = ErrorResponse),
    )
)]
pub async fn round_players(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx)?;

    let round_id = RoundId::from_uuid(id);
    let players = state.rounds.round_players(round_id).await?;
    Ok(Json(serde_json::json!({
        "round_id": round_id,
        "players": players,
    })))
}

/// `POST /rounds/:id/finish` — Archive a round. Admin only.
///
/// # Errors
///
/// Returns [`ArenaError::RoundNotFound`] when the round does not exist
/// or is already finished.
#[utoipa::path(
    post,
    path = "/api/v1/rounds/{id}/finish",
    tag = "Rounds",
    summary = "Finish a round",
    description = "Archives participant scores and flips the round to finished in one transaction, then rebroadcasts the leaderboard.",
    params(
        ("id" = uuid::Uuid, Path, description = "Round UUID"),
    ),
    responses(
        (status = 200, description = "Round finished", body = serde_json::Value),
        (status = 404, description = "Round not found or already finished", body = ErrorResponse),
    )
)]
pub async fn finish_round(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx)?;

    let round_id = RoundId::from_uuid(id);
    let event_id = state.rounds.finish_round(round_id).await?;
    Ok(Json(serde_json::json!({
        "round_id": round_id,
        "event_id": event_id,
    })))
}

/// Round routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/rounds", post(create_round))
        .route("/rounds/{id}/start", post(start_round))
        .route("/rounds/{id}/players", get(round_players))
        .route("/rounds/{id}/finish", post(finish_round))
}
