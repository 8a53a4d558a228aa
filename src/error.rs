//! Gateway error types with HTTP status code mapping.
//!
//! [`ArenaError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! The WebSocket layer reuses the same numeric codes inside error frames.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "event not found: 7e6f...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           | HTTP Status                  |
/// |-----------|--------------------|------------------------------|
/// | 1000–1999 | Validation/Request | 400 Bad Request              |
/// | 2000–2999 | Not Found / State  | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server/Persistence | 500 Internal Server Error    |
/// | 4000–4999 | Identity/Access    | 401 / 403                    |
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// Missing, malformed, or expired bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the role does not permit the action.
    #[error("forbidden: admin role required")]
    Forbidden,

    /// The user carries the global disqualification flag.
    #[error("user is disqualified")]
    Disqualified,

    /// Event with the given ID was not found.
    #[error("event not found: {0}")]
    EventNotFound(uuid::Uuid),

    /// Round with the given ID was not found.
    #[error("round not found: {0}")]
    RoundNotFound(uuid::Uuid),

    /// Security alert with the given ID was not found.
    #[error("alert not found: {0}")]
    AlertNotFound(uuid::Uuid),

    /// User with the given ID was not found.
    #[error("user not found: {0}")]
    UserNotFound(uuid::Uuid),

    /// Action attempted against an event or round in the wrong lifecycle
    /// state (e.g. starting an already-playing round).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unsupported or invalid game type string.
    #[error("invalid game type: {0}")]
    InvalidGameType(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ArenaError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidGameType(_) => 1002,
            Self::EventNotFound(_) => 2001,
            Self::RoundNotFound(_) => 2002,
            Self::AlertNotFound(_) => 2003,
            Self::UserNotFound(_) => 2004,
            Self::InvalidState(_) => 2100,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Unauthorized(_) => 4001,
            Self::Forbidden => 4003,
            Self::Disqualified => 4010,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidGameType(_) => StatusCode::BAD_REQUEST,
            Self::EventNotFound(_)
            | Self::RoundNotFound(_)
            | Self::AlertNotFound(_)
            | Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::Disqualified => StatusCode::FORBIDDEN,
        }
    }
}

impl From<sqlx::Error> for ArenaError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl From<serde_json::Error> for ArenaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ArenaError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ArenaError::EventNotFound(uuid::Uuid::new_v4());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), 2001);
    }

    #[test]
    fn invalid_state_maps_to_conflict() {
        let err = ArenaError::InvalidState("round already playing".to_string());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), 2100);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let err = ArenaError::Unauthorized("no token".to_string());
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn disqualified_maps_to_403() {
        let err = ArenaError::Disqualified;
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), 4010);
    }
}
