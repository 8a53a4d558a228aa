//! Event handlers: listing, details, leaderboard, and admin lifecycle.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::{authenticate, require_admin};
use crate::api::dto::{CreateEventRequest, EventCreatedResponse};
use crate::app_state::AppState;
use crate::domain::EventId;
use crate::error::{ArenaError, ErrorResponse};

/// `GET /events` — List open events.
///
/// # Errors
///
/// Returns [`ArenaError`] on persistence failure.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List open events",
    description = "Returns events in waiting or active status, newest first.",
    responses(
        (status = 200, description = "Open events", body = serde_json::Value),
    )
)]
pub async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse, ArenaError> {
    let events = state.events.list_open_events().await?;
    Ok(Json(serde_json::json!({ "events": events })))
}

/// `GET /events/:id` — Event details aggregate.
///
/// # Errors
///
/// Returns [`ArenaError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get event details",
    description = "Returns the event, its roster, the current leaderboard, and the active round if any.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event details", body = serde_json::Value),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ArenaError> {
    let details = state.events.event_details(EventId::from_uuid(id)).await?;
    Ok(Json(details))
}

/// `GET /events/:id/leaderboard` — Current combined leaderboard.
///
/// # Errors
///
/// Returns [`ArenaError`] on persistence failure.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/leaderboard",
    tag = "Events",
    summary = "Get event leaderboard",
    description = "Returns the ranked board combining archived and live scores, decorated with live-play status while a round is playing.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Ranked leaderboard", body = serde_json::Value),
    )
)]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ArenaError> {
    let event_id = EventId::from_uuid(id);
    let entries = state.leaderboards.current_board(event_id).await?;
    Ok(Json(serde_json::json!({
        "event_id": event_id,
        "entries": entries,
    })))
}

/// `GET /events/:id/rank` — The caller's rank within the event.
///
/// # Errors
///
/// Returns [`ArenaError::Unauthorized`] without a valid bearer token.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/rank",
    tag = "Events",
    summary = "Get own rank",
    description = "Returns the authenticated user's 1-based rank, score, and the board size.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Rank lookup", body = serde_json::Value),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn get_rank(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    let rank = state
        .leaderboards
        .user_rank(EventId::from_uuid(id), ctx.user_id)
        .await?;
    Ok(Json(rank))
}

/// `POST /events` — Create an event. Admin only.
///
/// # Errors
///
/// Returns [`ArenaError::Forbidden`] for non-admin callers.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create an event",
    description = "Creates a new event in waiting status. Requires an admin bearer token.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventCreatedResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx)?;

    if req.name.trim().is_empty() {
        return Err(ArenaError::InvalidRequest("event name is empty".to_string()));
    }

    let event = state.events.create_event(req.name.trim(), ctx.user_id).await?;
    let response = EventCreatedResponse {
        event_id: event.id,
        name: event.name,
        status: event.status.as_str().to_string(),
        created_at: event.created_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /events/:id/finish` — Finish an event. Admin only, idempotent.
///
/// # Errors
///
/// Returns [`ArenaError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/finish",
    tag = "Events",
    summary = "Finish an event",
    description = "Marks the event finished. Finishing twice is a no-op success.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 204, description = "Event finished"),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn finish_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx)?;

    state.events.finish_event(EventId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/leaderboard", get(get_leaderboard))
        .route("/events/{id}/rank", get(get_rank))
        .route("/events/{id}/finish", post(finish_event))
}
