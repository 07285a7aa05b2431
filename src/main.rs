mod config;
mod error;
mod models;
mod routes;
mod services;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::{PlaylistFetcher, StoreService};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub store: StoreService,
    pub fetcher: PlaylistFetcher,
    pub start_time: Instant,
}

/// Build the application router
fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        // Auth endpoints
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        // Playlist endpoints
        .route(
            "/api/playlists",
            get(routes::playlists::list_playlists).post(routes::playlists::add_playlist),
        )
        .route("/api/playlists/upload", post(routes::playlists::upload_playlist))
        .route("/api/playlists/:id", delete(routes::playlists::delete_playlist))
        // Channel endpoints
        .route("/api/channels", get(routes::channels::list_channels))
        .route("/api/channels/groups", get(routes::channels::list_groups))
        // Favorites endpoints
        .route("/api/favorites", get(routes::channels::list_favorites))
        .route("/api/favorites/toggle", post(routes::channels::toggle_favorite))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "channelhaven_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    tracing::info!("Starting ChannelHaven Server v{}", env!("CARGO_PKG_VERSION"));

    // Open the key-value store
    let store = StoreService::open(&config.data_dir).await?;
    tracing::info!("Store opened: {}", config.data_dir);

    // Relay-backed playlist fetcher
    let fetcher = PlaylistFetcher::new(&config.user_agent, config.fetch_timeout_ms);
    tracing::info!(
        "Playlist fetcher initialized (timeout {}ms)",
        config.fetch_timeout_ms
    );

    // Build application state
    let state = Arc::new(AppState {
        config,
        store,
        fetcher,
        start_time: Instant::now(),
    });

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetcher::{Relay, RelayKind};
    use axum::http::StatusCode as AxumStatus;
    use reqwest::StatusCode;

    const PLAYLIST: &str = "#EXTM3U\n\
        #EXTINF:-1 tvg-logo=\"http://x/logo.png\" group-title=\"News\",BBC News\n\
        http://stream/bbc.m3u8\n\
        #EXTINF:-1 group-title=\"Sports\",Sky Sports\n\
        http://stream/sky.m3u8\n";

    /// Serve the app on a loopback port with a temp-dir store. When
    /// `relay` is given the fetcher routes through it instead of the
    /// public relays. `tweak` adjusts the config before the app starts.
    async fn spawn_app_with<F>(
        relay: Option<Relay>,
        tweak: F,
    ) -> (String, Arc<AppState>, tempfile::TempDir)
    where
        F: FnOnce(&mut Config),
    {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            port: 0,
            admin_password: "secret".to_string(),
            session_ttl_seconds: 3600,
            remember_me_days: 30,
            fetch_timeout_ms: 5_000,
            user_agent: "test-agent".to_string(),
            data_dir: dir.path().to_string_lossy().into_owned(),
            max_items_page: 5000,
        };
        tweak(&mut config);

        let store = StoreService::open(&config.data_dir).await.unwrap();
        let fetcher = PlaylistFetcher::with_relays(
            &config.user_agent,
            config.fetch_timeout_ms,
            relay.into_iter().collect(),
        );

        let state = Arc::new(AppState {
            config,
            store,
            fetcher,
            start_time: Instant::now(),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let serve_state = state.clone();
        tokio::spawn(async move {
            axum::serve(listener, app(serve_state)).await.unwrap();
        });

        (format!("http://{}", addr), state, dir)
    }

    async fn spawn_app(relay: Option<Relay>) -> (String, tempfile::TempDir) {
        let (base, _state, dir) = spawn_app_with(relay, |_| {}).await;
        (base, dir)
    }

    /// Stub origin that serves playlist text, reachable through a Raw relay
    async fn spawn_playlist_origin() -> Relay {
        let stub = Router::new().route("/playlist", get(|| async { PLAYLIST }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });

        Relay {
            name: "stub",
            endpoint: format!("http://{}/playlist?url=", addr),
            kind: RelayKind::Raw,
        }
    }

    async fn login(client: &reqwest::Client, base: &str) -> String {
        let resp = client
            .post(format!("{}/api/auth/login", base))
            .json(&serde_json::json!({ "password": "secret" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn upload(client: &reqwest::Client, base: &str, token: &str) {
        let resp = client
            .post(format!("{}/api/playlists/upload", base))
            .bearer_auth(token)
            .json(&serde_json::json!({ "content": PLAYLIST, "name": "Test List" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/auth/login", base))
            .json(&serde_json::json!({ "password": "wrong" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_mutating_route_requires_token() {
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/playlists/upload", base))
            .json(&serde_json::json!({ "content": PLAYLIST }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_removed() {
        let (base, state, _dir) = spawn_app_with(None, |config| {
            config.session_ttl_seconds = 0;
        })
        .await;
        let client = reqwest::Client::new();
        let token = login(&client, &base).await;

        let resp = client
            .post(format!("{}/api/playlists/upload", base))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "content": PLAYLIST }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // Rejection also purges the stale session record
        let stale: Option<crate::models::Session> =
            state.store.get(&format!("session:{}", token)).await;
        assert!(stale.is_none());
    }

    #[tokio::test]
    async fn test_remember_me_with_huge_window_saturates() {
        let (base, _state, _dir) = spawn_app_with(None, |config| {
            config.remember_me_days = u64::MAX;
        })
        .await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/auth/login", base))
            .json(&serde_json::json!({ "password": "secret", "rememberMe": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["expiresAt"].as_i64(), Some(i64::MAX));

        let token = body["token"].as_str().unwrap().to_string();
        upload(&client, &base, &token).await;
    }

    #[tokio::test]
    async fn test_upload_then_list_channels_and_groups() {
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();
        let token = login(&client, &base).await;
        upload(&client, &base, &token).await;

        let body: serde_json::Value = client
            .get(format!("{}/api/channels", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["total"], 2);
        assert_eq!(body["channels"][0]["name"], "BBC News");
        assert_eq!(body["channels"][0]["logo"], "http://x/logo.png");

        let groups: serde_json::Value = client
            .get(format!("{}/api/channels/groups", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(groups["total"], 2);
        assert_eq!(groups["groups"][0]["name"], "News");
        assert_eq!(groups["groups"][1]["name"], "Sports");
    }

    #[tokio::test]
    async fn test_channel_filtering_and_pagination() {
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();
        let token = login(&client, &base).await;
        upload(&client, &base, &token).await;

        let filtered: serde_json::Value = client
            .get(format!("{}/api/channels?group=News", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(filtered["total"], 1);

        let searched: serde_json::Value = client
            .get(format!("{}/api/channels?q=sky", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(searched["total"], 1);
        assert_eq!(searched["channels"][0]["name"], "Sky Sports");

        let paged: serde_json::Value = client
            .get(format!("{}/api/channels?limit=1&offset=1", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(paged["channels"].as_array().unwrap().len(), 1);
        assert_eq!(paged["hasMore"], false);
    }

    #[tokio::test]
    async fn test_invalid_upload_content_is_rejected() {
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();
        let token = login(&client, &base).await;

        let resp = client
            .post(format!("{}/api/playlists/upload", base))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "content": "<!DOCTYPE html>\n<html>nope</html>" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("Invalid M3U content"));
    }

    #[tokio::test]
    async fn test_registering_same_url_twice_replaces_channels() {
        let relay = spawn_playlist_origin().await;
        let (base, _dir) = spawn_app(Some(relay)).await;
        let client = reqwest::Client::new();
        let token = login(&client, &base).await;

        for _ in 0..2 {
            let resp = client
                .post(format!("{}/api/playlists", base))
                .bearer_auth(&token)
                .json(&serde_json::json!({ "url": "http://origin/list.m3u" }))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let playlists: serde_json::Value = client
            .get(format!("{}/api/playlists", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(playlists["total"], 1);

        let channels: serde_json::Value = client
            .get(format!("{}/api/channels", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(channels["total"], 2);
    }

    #[tokio::test]
    async fn test_favorite_toggle_is_an_involution() {
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();
        let token = login(&client, &base).await;
        upload(&client, &base, &token).await;

        let target = serde_json::json!({ "name": "BBC News", "url": "http://stream/bbc.m3u8" });

        let first: serde_json::Value = client
            .post(format!("{}/api/favorites/toggle", base))
            .bearer_auth(&token)
            .json(&target)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(first["favorite"], true);

        let favorites: serde_json::Value = client
            .get(format!("{}/api/favorites", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(favorites["total"], 1);

        let second: serde_json::Value = client
            .post(format!("{}/api/favorites/toggle", base))
            .bearer_auth(&token)
            .json(&target)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(second["favorite"], false);
    }

    #[tokio::test]
    async fn test_favoriting_unknown_channel_is_not_found() {
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();
        let token = login(&client, &base).await;

        let resp = client
            .post(format!("{}/api/favorites/toggle", base))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "name": "Ghost", "url": "http://nowhere" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_playlist_removes_its_channels() {
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();
        let token = login(&client, &base).await;
        upload(&client, &base, &token).await;

        let playlists: serde_json::Value = client
            .get(format!("{}/api/playlists", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = playlists["playlists"][0]["id"].as_str().unwrap().to_string();

        let resp = client
            .delete(format!("{}/api/playlists/{}", base, id))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let channels: serde_json::Value = client
            .get(format!("{}/api/channels", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(channels["total"], 0);

        let resp = client
            .delete(format!("{}/api/playlists/{}", base, id))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_untouched() {
        // No relays configured: every registration fails upstream
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();
        let token = login(&client, &base).await;

        let resp = client
            .post(format!("{}/api/playlists", base))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "url": "http://origin/list.m3u" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let playlists: serde_json::Value = client
            .get(format!("{}/api/playlists", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(playlists["total"], 0);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (base, _dir) = spawn_app(None).await;
        let client = reqwest::Client::new();

        let root: serde_json::Value = client
            .get(&base)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(root["status"], "running");

        let resp = client.get(format!("{}/health", base)).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), AxumStatus::OK.as_u16());
    }
}
