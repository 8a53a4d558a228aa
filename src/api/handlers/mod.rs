//! REST endpoint handlers organized by resource.

pub mod event;
pub mod round;
pub mod security;
pub mod system;

use axum::Router;
use axum::http::HeaderMap;

use crate::app_state::AppState;
use crate::auth::{AuthContext, bearer_token};
use crate::error::ArenaError;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(event::routes())
        .merge(round::routes())
        .merge(security::routes())
}

/// Resolves the caller's identity from the `Authorization` header.
///
/// # Errors
///
/// Returns [`ArenaError::Unauthorized`] for a missing or invalid token.
pub(crate) fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthContext, ArenaError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = bearer_token(header)?;
    state.verifier.verify(token)
}

/// Rejects non-admin callers.
pub(crate) fn require_admin(ctx: &AuthContext) -> Result<(), ArenaError> {
    if ctx.role.is_admin() {
        Ok(())
    } else {
        Err(ArenaError::Forbidden)
    }
}
