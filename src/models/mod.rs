//! Data types shared across services and routes

pub mod auth;
pub mod channel;

pub use auth::{LoginRequest, LoginResponse, Session};
pub use channel::{channel_id, Channel, GroupSummary, ParsedChannel, PlaylistLink};
