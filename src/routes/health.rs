use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{Channel, PlaylistLink};
use crate::AppState;

/// Root endpoint - basic status
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "ChannelHaven Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "runtime": "rust"
    }))
}

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    uptime: u64,
    playlists: usize,
    channels: usize,
    store_keys: usize,
}

/// GET /health - Store-backed health check
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    let links: Vec<PlaylistLink> = state.store.get("links").await.unwrap_or_default();
    let channels: Vec<Channel> = state.store.get("channels").await.unwrap_or_default();

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime,
        playlists: links.len(),
        channels: channels.len(),
        store_keys: state.store.len().await,
    })
}
