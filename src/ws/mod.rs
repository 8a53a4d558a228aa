//! WebSocket layer: connection handling, command routing, topic
//! subscriptions.
//!
//! `/ws` is the player endpoint, `/ws/admin` the privileged one. Both
//! verify the bearer token before the upgrade; each connection keeps a
//! private topic set that filters the shared notice bus.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
