//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::domain::EventBus;
use crate::service::{EventService, LeaderboardService, RoundService, SecurityService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event lifecycle and roster operations.
    pub events: EventService,
    /// Round lifecycle and live scoring.
    pub rounds: RoundService,
    /// Suspicious-activity tracking and alert workflows.
    pub security: SecurityService,
    /// Leaderboard reads and decoration.
    pub leaderboards: LeaderboardService,
    /// Notice bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Bearer token verifier used at every handshake.
    pub verifier: Arc<dyn TokenVerifier>,
}
