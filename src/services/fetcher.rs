use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::PlaylistError;
use crate::models::ParsedChannel;
use crate::services::parser::parse_m3u;

/// How a relay wraps the target response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    /// JSON envelope with the body in a `contents` field
    JsonContents,
    /// Raw body text passed through unchanged
    Raw,
}

/// A cross-origin relay endpoint. The percent-encoded target URL is
/// appended to `endpoint` to form the request.
#[derive(Debug, Clone)]
pub struct Relay {
    pub name: &'static str,
    pub endpoint: String,
    pub kind: RelayKind,
}

impl Relay {
    fn request_url(&self, target: &str) -> String {
        format!("{}{}", self.endpoint, urlencoding::encode(target))
    }
}

/// Public relays tried in order. Playlist hosts rarely send permissive
/// CORS headers, so browser frontends can only reach them through these.
fn default_relays() -> Vec<Relay> {
    vec![
        Relay {
            name: "allorigins",
            endpoint: "https://api.allorigins.win/get?url=".to_string(),
            kind: RelayKind::JsonContents,
        },
        Relay {
            name: "corsproxy",
            endpoint: "https://corsproxy.io/?".to_string(),
            kind: RelayKind::Raw,
        },
    ]
}

/// allorigins-style envelope around the proxied body
#[derive(Deserialize)]
struct RelayEnvelope {
    contents: String,
}

/// Fetches playlist text through an ordered list of relays and parses it.
///
/// Relays are tried sequentially; the first non-empty body short-circuits
/// the rest. A failed relay is never retried. The fetcher holds no state
/// between calls and caches nothing.
pub struct PlaylistFetcher {
    client: Client,
    relays: Vec<Relay>,
}

impl PlaylistFetcher {
    pub fn new(user_agent: &str, timeout_ms: u64) -> Self {
        Self::with_relays(user_agent, timeout_ms, default_relays())
    }

    /// Build a fetcher with an explicit relay list (tests point this at a
    /// local stub server).
    pub fn with_relays(user_agent: &str, timeout_ms: u64, relays: Vec<Relay>) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_millis(timeout_ms))
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, relays }
    }

    /// Fetch a playlist URL through the relay chain and parse the result.
    ///
    /// Fails fast on a syntactically invalid URL before any network
    /// attempt. Parser failures propagate unchanged.
    pub async fn fetch(&self, url: &str) -> Result<Vec<ParsedChannel>, PlaylistError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| PlaylistError::Fetch(format!("invalid URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PlaylistError::Fetch(format!(
                "invalid URL: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let content = self.fetch_via_relays(url).await?;
        parse_m3u(&content)
    }

    async fn fetch_via_relays(&self, target: &str) -> Result<String, PlaylistError> {
        let mut last_error: Option<PlaylistError> = None;

        for relay in &self.relays {
            match self.try_relay(relay, target).await {
                Ok(content) if !content.trim().is_empty() => {
                    tracing::info!("Fetched playlist through relay {}", relay.name);
                    return Ok(content);
                }
                Ok(_) => {
                    tracing::warn!("Relay {} returned an empty body", relay.name);
                }
                Err(err) => {
                    tracing::warn!("Relay {} failed: {}", relay.name, err);
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| PlaylistError::Fetch("all relay endpoints failed".to_string())))
    }

    async fn try_relay(&self, relay: &Relay, target: &str) -> Result<String, PlaylistError> {
        let request_url = relay.request_url(target);
        tracing::debug!("Trying relay {}: {}", relay.name, request_url);

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .map_err(|e| PlaylistError::Fetch(format!("relay {} unreachable: {}", relay.name, e)))?;

        if !response.status().is_success() {
            return Err(PlaylistError::Fetch(format!(
                "relay {} returned HTTP {}",
                relay.name,
                response.status().as_u16()
            )));
        }

        match relay.kind {
            RelayKind::JsonContents => {
                let envelope: RelayEnvelope = response.json().await.map_err(|e| {
                    PlaylistError::Fetch(format!(
                        "relay {} returned a malformed envelope: {}",
                        relay.name, e
                    ))
                })?;
                Ok(envelope.contents)
            }
            RelayKind::Raw => response.text().await.map_err(|e| {
                PlaylistError::Fetch(format!("relay {} body read failed: {}", relay.name, e))
            }),
        }
    }
}
