use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{Channel, GroupSummary};
use crate::routes::auth::require_admin;
use crate::AppState;

/// Query parameters for the channel listing
#[derive(Debug, Deserialize)]
pub struct ChannelsQuery {
    #[serde(default)]
    pub group: Option<String>,
    /// Case-insensitive substring match on the channel name
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Paginated channels response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsResponse {
    pub channels: Vec<Channel>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Groups response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsResponse {
    pub groups: Vec<GroupSummary>,
    pub total: usize,
}

/// Favorite toggle request; channels are matched structurally by
/// `(name, url)`, not by id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFavoriteRequest {
    pub name: String,
    pub url: String,
}

/// GET /api/channels - Paginated, filtered channel listing
pub async fn list_channels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChannelsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let channels: Vec<Channel> = state.store.get("channels").await.unwrap_or_default();

    let needle = query.q.as_deref().map(str::to_lowercase);
    let filtered: Vec<Channel> = channels
        .into_iter()
        .filter(|channel| {
            query
                .group
                .as_deref()
                .map_or(true, |group| channel.group == group)
        })
        .filter(|channel| {
            needle
                .as_deref()
                .map_or(true, |q| channel.name.to_lowercase().contains(q))
        })
        .collect();

    let total = filtered.len();
    let limit = query.limit.min(state.config.max_items_page);
    let page: Vec<Channel> = filtered.into_iter().skip(query.offset).take(limit).collect();
    let has_more = query.offset + page.len() < total;

    Ok(Json(ChannelsResponse {
        channels: page,
        total,
        limit,
        offset: query.offset,
        has_more,
    }))
}

/// GET /api/channels/groups - Distinct groups in first-appearance order
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let channels: Vec<Channel> = state.store.get("channels").await.unwrap_or_default();

    let mut groups: Vec<GroupSummary> = Vec::new();
    for channel in &channels {
        match groups.iter_mut().find(|g| g.name == channel.group) {
            Some(group) => group.channel_count += 1,
            None => groups.push(GroupSummary {
                name: channel.group.clone(),
                channel_count: 1,
            }),
        }
    }

    Ok(Json(GroupsResponse {
        total: groups.len(),
        groups,
    }))
}

/// GET /api/favorites - Favorite channels
pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let favorites: Vec<Channel> = state.store.get("favorites").await.unwrap_or_default();

    Ok(Json(serde_json::json!({
        "total": favorites.len(),
        "favorites": favorites
    })))
}

/// POST /api/favorites/toggle - Add or remove a favorite
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ToggleFavoriteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers).await?;

    let mut favorites: Vec<Channel> = state.store.get("favorites").await.unwrap_or_default();

    let is_favorite = if let Some(pos) = favorites
        .iter()
        .position(|fav| fav.name == payload.name && fav.url == payload.url)
    {
        favorites.remove(pos);
        false
    } else {
        let channels: Vec<Channel> = state.store.get("channels").await.unwrap_or_default();
        let channel = channels
            .into_iter()
            .find(|channel| channel.name == payload.name && channel.url == payload.url)
            .ok_or_else(|| ApiError::NotFound("Channel not found".to_string()))?;
        favorites.push(channel);
        true
    };

    state.store.set("favorites", &favorites).await?;

    tracing::info!(
        "Favorite {} for '{}'",
        if is_favorite { "added" } else { "removed" },
        payload.name
    );

    Ok(Json(serde_json::json!({ "favorite": is_favorite })))
}
