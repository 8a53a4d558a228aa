//! Security alert handlers for the admin review UI.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::{authenticate, require_admin};
use crate::api::dto::AlertQuery;
use crate::app_state::AppState;
use crate::domain::{AlertId, EventId};
use crate::error::{ArenaError, ErrorResponse};

/// Request body for alert resolution endpoints.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResolveAlertRequest {
    /// Disqualification reason (required for disqualify).
    #[serde(default)]
    pub reason: Option<String>,
    /// Free-form admin notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// `GET /admin/alerts` — Pending security alerts. Admin only.
///
/// # Errors
///
/// Returns [`ArenaError::Forbidden`] for non-admin callers.
#[utoipa::path(
    get,
    path = "/api/v1/admin/alerts",
    tag = "Security",
    summary = "List pending alerts",
    description = "Returns pending security alerts hydrated with usernames, event names, and activity records, optionally filtered by event.",
    params(
        ("event_id" = Option<uuid::Uuid>, Query, description = "Restrict to one event"),
    ),
    responses(
        (status = 200, description = "Pending alerts", body = serde_json::Value),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    )
)]
pub async fn pending_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AlertQuery>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx)?;

    let alerts = state
        .security
        .pending_alerts(query.event_id.map(EventId::from_uuid))
        .await?;
    Ok(Json(serde_json::json!({ "alerts": alerts })))
}

/// `POST /admin/alerts/:id/dismiss` — Dismiss a pending alert. Admin only.
///
/// # Errors
///
/// Returns [`ArenaError::AlertNotFound`] when the alert does not exist,
/// or [`ArenaError::InvalidState`] when it is already resolved.
#[utoipa::path(
    post,
    path = "/api/v1/admin/alerts/{id}/dismiss",
    tag = "Security",
    summary = "Dismiss an alert",
    description = "Marks the alert and its activities dismissed. No effect on the flagged user.",
    params(
        ("id" = uuid::Uuid, Path, description = "Alert UUID"),
    ),
    request_body = ResolveAlertRequest,
    responses(
        (status = 204, description = "Alert dismissed"),
        (status = 404, description = "Alert not found", body = ErrorResponse),
        (status = 409, description = "Alert already resolved", body = ErrorResponse),
    )
)]
pub async fn dismiss_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ResolveAlertRequest>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx)?;

    state
        .security
        .dismiss_alert(AlertId::from_uuid(id), ctx.user_id, req.notes.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/alerts/:id/disqualify` — Disqualify via alert. Admin only.
///
/// # Errors
///
/// Returns [`ArenaError::InvalidRequest`] when no reason is given.
#[utoipa::path(
    post,
    path = "/api/v1/admin/alerts/{id}/disqualify",
    tag = "Security",
    summary = "Disqualify the flagged user",
    description = "Resolves the alert by disqualifying the user: global flag set, roster entry removed, non-finished participant rows marked. Runs as one transaction.",
    params(
        ("id" = uuid::Uuid, Path, description = "Alert UUID"),
    ),
    request_body = ResolveAlertRequest,
    responses(
        (status = 204, description = "User disqualified"),
        (status = 400, description = "Missing reason", body = ErrorResponse),
        (status = 404, description = "Alert not found", body = ErrorResponse),
        (status = 409, description = "Alert already resolved", body = ErrorResponse),
    )
)]
pub async fn disqualify_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ResolveAlertRequest>,
) -> Result<impl IntoResponse, ArenaError> {
    let ctx = authenticate(&state, &headers)?;
    require_admin(&ctx)?;

    let reason = req
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ArenaError::InvalidRequest("disqualification reason is required".to_string()))?;

    state
        .security
        .disqualify_user(AlertId::from_uuid(id), ctx.user_id, reason, req.notes.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Security routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/alerts", get(pending_alerts))
        .route("/admin/alerts/{id}/dismiss", post(dismiss_alert))
        .route("/admin/alerts/{id}/disqualify", post(disqualify_user))
}
