//! Request/response DTOs for the REST surface.

pub mod event_dto;

pub use event_dto::{AlertQuery, CreateEventRequest, CreateRoundRequest, EventCreatedResponse};
