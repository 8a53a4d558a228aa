//! Persistence layer: PostgreSQL gateway for events, rounds, scores,
//! and security records.
//!
//! [`postgres::PostgresStore`] owns the `sqlx::PgPool` and exposes
//! parameterized queries plus the two transactional consistency points
//! (round archival, disqualification cascade).

pub mod postgres;

pub use postgres::PostgresStore;
