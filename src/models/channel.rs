use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// A channel as parsed straight out of playlist text.
///
/// Ephemeral: rebuilt on every parse and handed to the caller, which may
/// merge it into the persistent collection or discard it. Identity for
/// favorite-matching is the structural `(name, url)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedChannel {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// A channel persisted in the collection, tied to the playlist it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub playlist_id: String,
    pub added_at: i64,
}

impl Channel {
    /// Promote a parsed channel into a stored record.
    pub fn from_parsed(parsed: ParsedChannel, playlist_id: &str, added_at: i64) -> Self {
        Self {
            id: channel_id(&parsed.name, &parsed.url),
            name: parsed.name,
            url: parsed.url,
            logo: parsed.logo,
            group: parsed.group,
            language: parsed.language,
            country: parsed.country,
            playlist_id: playlist_id.to_string(),
            added_at,
        }
    }
}

/// Stable id derived from the channel's structural identity.
pub fn channel_id(name: &str, url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(name.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A registered M3U playlist source. `url` is absent for file uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistLink {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: i64,
    pub channel_count: usize,
}

/// Group summary for the channel browser sidebar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub name: String,
    pub channel_count: usize,
}
