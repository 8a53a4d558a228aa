//! Axum WebSocket upgrade handlers.
//!
//! The bearer token is carried as a `token` query parameter and
//! verified before the upgrade completes; unauthenticated sockets are
//! refused at handshake. The admin endpoint additionally requires
//! `role = admin`.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::error::ArenaError;

/// Query parameters for the WebSocket handshake.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Bearer token issued by the auth service.
    pub token: Option<String>,
}

/// `GET /ws` — upgrade to the player WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let ctx = match verify(&state, query.token.as_deref()) {
        Ok(ctx) => ctx,
        Err(error) => return error.into_response(),
    };

    tracing::debug!(user_id = %ctx.user_id, "ws handshake accepted");
    ws.on_upgrade(move |socket| run_connection(socket, ctx, state))
}

/// `GET /ws/admin` — upgrade to the admin WebSocket. Rejects non-admin
/// tokens at handshake.
pub async fn admin_ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let ctx = match verify(&state, query.token.as_deref()) {
        Ok(ctx) => ctx,
        Err(error) => return error.into_response(),
    };
    if !ctx.role.is_admin() {
        return ArenaError::Forbidden.into_response();
    }

    tracing::debug!(user_id = %ctx.user_id, "admin ws handshake accepted");
    ws.on_upgrade(move |socket| run_connection(socket, ctx, state))
}

fn verify(
    state: &AppState,
    token: Option<&str>,
) -> Result<crate::auth::AuthContext, ArenaError> {
    let token =
        token.ok_or_else(|| ArenaError::Unauthorized("missing token parameter".to_string()))?;
    state.verifier.verify(token)
}
