//! Service layer: business logic orchestration.
//!
//! Each service coordinates one concern over the shared
//! [`crate::persistence::PostgresStore`] and publishes notices through
//! the [`crate::domain::EventBus`]: event lifecycle/roster, round
//! lifecycle/scoring, security escalation, and leaderboard reads.

pub mod event_service;
pub mod leaderboard_service;
pub mod round_service;
pub mod security_service;
pub mod validator;

pub use event_service::EventService;
pub use leaderboard_service::LeaderboardService;
pub use round_service::RoundService;
pub use security_service::SecurityService;
