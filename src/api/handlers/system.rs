//! System endpoints: health check and game-type catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::GameType;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Supported game type info.
#[derive(Debug, Serialize, ToSchema)]
struct GameTypeInfo {
    game_type: &'static str,
    description: &'static str,
    telemetry_cross_check: bool,
}

/// `GET /config/game-types` — List supported game types.
#[utoipa::path(
    get,
    path = "/config/game-types",
    tag = "System",
    summary = "List supported game types",
    description = "Returns metadata for every mini-game type a round can be created with.",
    responses(
        (status = 200, description = "Game type catalog", body = Vec<GameTypeInfo>),
    )
)]
pub async fn game_types_handler() -> impl IntoResponse {
    let types = vec![
        GameTypeInfo {
            game_type: GameType::Flybird.as_str(),
            description: "Flappy-style obstacle game, one point per obstacle",
            telemetry_cross_check: true,
        },
        GameTypeInfo {
            game_type: GameType::EndlessRunner.as_str(),
            description: "Vertical endless runner, height-derived score",
            telemetry_cross_check: false,
        },
        GameTypeInfo {
            game_type: GameType::Reaction.as_str(),
            description: "Reaction time trials",
            telemetry_cross_check: false,
        },
    ];
    (StatusCode::OK, Json(types))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/game-types", get(game_types_handler))
}
