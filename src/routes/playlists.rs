use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Channel, ParsedChannel, PlaylistLink};
use crate::routes::auth::require_admin;
use crate::services::parser::parse_m3u;
use crate::AppState;

const DEFAULT_LIST_NAME: &str = "My M3U List";

/// Request to register a playlist URL
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPlaylistRequest {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to import an uploaded playlist file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPlaylistRequest {
    pub content: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response after a successful import
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub playlist: PlaylistLink,
    pub channel_count: usize,
}

/// Registered playlists listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistsResponse {
    pub playlists: Vec<PlaylistLink>,
    pub total: usize,
}

/// POST /api/playlists - Register a playlist URL, fetch and import it
///
/// Fetch and parse happen before anything is persisted: on failure the
/// existing links and channels are left untouched. Re-registering an
/// already-known URL replaces that playlist's channels instead of
/// duplicating them.
pub async fn add_playlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AddPlaylistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers).await?;

    let url = payload.url.trim().to_string();
    if url.is_empty() {
        return Err(ApiError::BadRequest("URL is required".to_string()));
    }

    tracing::info!("Importing playlist from {}", url);
    let parsed = state.fetcher.fetch(&url).await?;

    let mut links: Vec<PlaylistLink> = state.store.get("links").await.unwrap_or_default();

    // Same URL means same playlist: reuse its id so the merge replaces
    let id = links
        .iter()
        .find(|link| link.url.as_deref() == Some(url.as_str()))
        .map(|link| link.id.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    links.retain(|link| link.id != id);

    let link = PlaylistLink {
        id,
        name: payload
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LIST_NAME.to_string()),
        url: Some(url),
        created_at: chrono::Utc::now().timestamp_millis(),
        channel_count: parsed.len(),
    };

    merge_import(&state, links, link, parsed).await
}

/// POST /api/playlists/upload - Import raw playlist text (file upload path)
pub async fn upload_playlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UploadPlaylistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers).await?;

    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Playlist content is required".to_string()));
    }

    let parsed = parse_m3u(&payload.content)?;

    let links: Vec<PlaylistLink> = state.store.get("links").await.unwrap_or_default();
    let link = PlaylistLink {
        id: Uuid::new_v4().to_string(),
        name: payload
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LIST_NAME.to_string()),
        url: None,
        created_at: chrono::Utc::now().timestamp_millis(),
        channel_count: parsed.len(),
    };

    merge_import(&state, links, link, parsed).await
}

/// Persist the link and merge its channels into the collection, replacing
/// any previous channels from the same playlist.
async fn merge_import(
    state: &AppState,
    mut links: Vec<PlaylistLink>,
    link: PlaylistLink,
    parsed: Vec<ParsedChannel>,
) -> Result<Json<ImportResponse>, ApiError> {
    let now = chrono::Utc::now().timestamp_millis();

    let mut channels: Vec<Channel> = state.store.get("channels").await.unwrap_or_default();
    channels.retain(|channel| channel.playlist_id != link.id);
    channels.extend(
        parsed
            .into_iter()
            .map(|channel| Channel::from_parsed(channel, &link.id, now)),
    );

    links.push(link.clone());

    state.store.set("links", &links).await?;
    state.store.set("channels", &channels).await?;

    tracing::info!(
        "Imported playlist '{}' ({} channels, {} total)",
        link.name,
        link.channel_count,
        channels.len()
    );

    Ok(Json(ImportResponse {
        channel_count: link.channel_count,
        playlist: link,
    }))
}

/// GET /api/playlists - List registered playlists
pub async fn list_playlists(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let playlists: Vec<PlaylistLink> = state.store.get("links").await.unwrap_or_default();

    Ok(Json(PlaylistsResponse {
        total: playlists.len(),
        playlists,
    }))
}

/// DELETE /api/playlists/:id - Remove a playlist and its channels
pub async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers).await?;

    let mut links: Vec<PlaylistLink> = state.store.get("links").await.unwrap_or_default();
    let before = links.len();
    links.retain(|link| link.id != id);
    if links.len() == before {
        return Err(ApiError::NotFound("Playlist not found".to_string()));
    }

    let mut channels: Vec<Channel> = state.store.get("channels").await.unwrap_or_default();
    let channels_before = channels.len();
    channels.retain(|channel| channel.playlist_id != id);
    let removed = channels_before - channels.len();

    state.store.set("links", &links).await?;
    state.store.set("channels", &channels).await?;

    tracing::info!("Deleted playlist {} ({} channels removed)", id, removed);

    Ok(Json(serde_json::json!({
        "success": true,
        "removedChannels": removed
    })))
}
