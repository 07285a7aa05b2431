//! HTTP route handlers

pub mod auth;
pub mod channels;
pub mod health;
pub mod playlists;
