//! Domain layer: identifiers, lifecycle state machines, entities,
//! broadcast topics, and the notice bus.
//!
//! This module contains the server-side domain model: typed entity IDs,
//! status enums with explicit transition tables, the entities of the
//! data model, the topic-scoped [`Notice`] type, and the [`EventBus`]
//! used for fan-out.

pub mod event_bus;
pub mod ids;
pub mod model;
pub mod notice;
pub mod status;
pub mod topic;

pub use event_bus::EventBus;
pub use ids::{ActivityId, AlertId, EventId, RoundId, UserId};
pub use notice::{AlertAction, Notice};
pub use status::{AlertStatus, EventStatus, GameType, ParticipantStatus, RoundStatus, Severity};
pub use topic::Topic;
