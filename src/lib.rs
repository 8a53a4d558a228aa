//! # arena-gateway
//!
//! Realtime orchestration core for live timed competitive events:
//! event/round/participant state machines, score ingestion and
//! validation, suspicious-activity escalation, dual-source leaderboard
//! aggregation, and topic-scoped WebSocket fan-out.
//!
//! The mini-games themselves run client-side; this service is the
//! authoritative coordination layer over a PostgreSQL store.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Connections (ws/) ── per-connection Topic set
//!     │
//!     ├── EventService / RoundService / SecurityService /
//!     │   LeaderboardService (service/)
//!     ├── EventBus (domain/) ── Notice fan-out
//!     │
//!     └── PostgresStore (persistence/) ── PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod tasks;
pub mod ws;
