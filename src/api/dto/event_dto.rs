//! Event and admin operation DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::EventId;

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Display name of the event.
    pub name: String,
}

/// Response body for `POST /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventCreatedResponse {
    /// New event identifier.
    pub event_id: EventId,
    /// Display name.
    pub name: String,
    /// Lifecycle status at creation (`waiting`).
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /events/{id}/rounds`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoundRequest {
    /// Game type, e.g. `flybird`, `endless_runner`, `reaction`.
    pub game_type: String,
}

/// Query parameters for the pending alert feed.
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Restrict to one event when set.
    #[serde(default)]
    pub event_id: Option<uuid::Uuid>,
}
