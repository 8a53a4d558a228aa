//! arena-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints plus
//! the periodic leaderboard broadcast loop.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use arena_gateway::api;
use arena_gateway::app_state::AppState;
use arena_gateway::auth::JwtVerifier;
use arena_gateway::config::ArenaConfig;
use arena_gateway::domain::EventBus;
use arena_gateway::persistence::PostgresStore;
use arena_gateway::service::{EventService, LeaderboardService, RoundService, SecurityService};
use arena_gateway::tasks::spawn_leaderboard_loop;
use arena_gateway::ws::handler::{admin_ws_handler, ws_handler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ArenaConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting arena-gateway");

    // Connect storage and run migrations
    let store = Arc::new(
        PostgresStore::connect(
            &config.database_url,
            config.database_max_connections,
            config.database_min_connections,
            config.database_connect_timeout_secs,
        )
        .await?,
    );

    // Build domain and service layers
    let event_bus = EventBus::new(config.bus_capacity);
    let security = SecurityService::new(
        Arc::clone(&store),
        event_bus.clone(),
        config.alert_threshold,
        config.alert_window_mins,
    );
    let events = EventService::new(Arc::clone(&store), event_bus.clone());
    let rounds = RoundService::new(
        Arc::clone(&store),
        event_bus.clone(),
        security.clone(),
        config.countdown_secs,
    );
    let leaderboards = LeaderboardService::new(Arc::clone(&store));

    // Periodic leaderboard push
    spawn_leaderboard_loop(
        events.clone(),
        leaderboards.clone(),
        event_bus.clone(),
        config.leaderboard_interval_secs,
    );

    // Build application state
    let app_state = AppState {
        events,
        rounds,
        security,
        leaderboards,
        event_bus,
        verifier: Arc::new(JwtVerifier::new(&config.jwt_secret)),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .route("/ws/admin", get(admin_ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
