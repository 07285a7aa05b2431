use lazy_static::lazy_static;
use regex::Regex;

use crate::error::PlaylistError;
use crate::models::ParsedChannel;

/// Group assigned when a playlist entry carries no group attribute
pub const DEFAULT_GROUP: &str = "General";

lazy_static! {
    /// Attribute extractors for EXTINF headers. Key names are matched
    /// case-insensitively; value casing is preserved verbatim.
    static ref LOGO_REGEX: Regex = Regex::new(r#"(?i)tvg-logo="([^"]+)""#).unwrap();
    static ref LOGO_ALT_REGEX: Regex = Regex::new(r#"(?i)\blogo="([^"]+)""#).unwrap();
    static ref GROUP_REGEX: Regex = Regex::new(r#"(?i)group-title="([^"]+)""#).unwrap();
    static ref GROUP_ALT_REGEX: Regex = Regex::new(r#"(?i)\bgroup="([^"]+)""#).unwrap();
    static ref LANGUAGE_REGEX: Regex = Regex::new(r#"(?i)tvg-language="([^"]+)""#).unwrap();
    static ref LANGUAGE_ALT_REGEX: Regex = Regex::new(r#"(?i)\blanguage="([^"]+)""#).unwrap();
    static ref COUNTRY_REGEX: Regex = Regex::new(r#"(?i)tvg-country="([^"]+)""#).unwrap();
    static ref COUNTRY_ALT_REGEX: Regex = Regex::new(r#"(?i)\bcountry="([^"]+)""#).unwrap();
}

/// Parse raw M3U/M3U8 playlist text into an ordered channel list.
///
/// Handles three input shapes, checked in this order:
/// 1. Error pages returned by a relay or origin instead of a playlist
///    (HTML documents, proxy error messages) fail fast.
/// 2. HLS media playlists (`#EXT-X-VERSION`/`#EXT-X-TARGETDURATION`)
///    collapse to a single "Live Stream" channel.
/// 3. Extended `#EXTINF` channel lists, with bare-URL lines accepted as
///    minimal channels.
///
/// Output order follows source-line order of first appearance; no
/// deduplication is performed. Pure and deterministic: parsing the same
/// text twice yields identical output.
pub fn parse_m3u(content: &str) -> Result<Vec<ParsedChannel>, PlaylistError> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    tracing::debug!("Parsing M3U content, {} non-empty lines", lines.len());

    if looks_like_error_page(content, &lines) {
        return Err(PlaylistError::Parse(
            "Invalid M3U content: the source returned an error or invalid response".to_string(),
        ));
    }

    let channels =
        if content.contains("#EXT-X-VERSION") || content.contains("#EXT-X-TARGETDURATION") {
            parse_hls_playlist(&lines)
        } else {
            parse_channel_list(&lines)
        };

    if channels.is_empty() {
        return Err(PlaylistError::Parse(
            "No valid channels found in M3U content".to_string(),
        ));
    }

    tracing::debug!("Parsed {} channels", channels.len());
    Ok(channels)
}

/// Detect proxy/origin error pages handed back in place of a playlist.
///
/// The legacy heuristic also rejected any content containing the bare
/// substring "error", which misclassifies playlists with channel names
/// like "Error Channel 404". That check is narrowed here: it only fires
/// when the content carries no `#EXT` tag at all.
fn looks_like_error_page(content: &str, lines: &[&str]) -> bool {
    if lines.len() < 2 {
        return true;
    }
    if content.contains("400: Invalid request") || content.contains("Invalid URL") {
        return true;
    }
    if content.contains("<html>") || content.contains("<HTML>") || content.contains("<!DOCTYPE") {
        return true;
    }
    if content.contains("error") && !content.contains("#EXT") {
        return true;
    }
    false
}

/// An HLS media playlist describes segments of one live stream, not a
/// channel list. Collapse it to a single channel on the first stream URL.
fn parse_hls_playlist(lines: &[&str]) -> Vec<ParsedChannel> {
    lines
        .iter()
        .find(|line| line.starts_with("http") && (line.contains(".m3u8") || line.contains(".ts")))
        .map(|url| {
            vec![ParsedChannel {
                name: "Live Stream".to_string(),
                url: url.to_string(),
                logo: None,
                group: "Live".to_string(),
                language: None,
                country: None,
            }]
        })
        .unwrap_or_default()
}

/// Walk an extended channel list: `#EXTINF:` headers paired with the
/// following URL line, plus bare URL lines as minimal channels.
fn parse_channel_list(lines: &[&str]) -> Vec<ParsedChannel> {
    let mut channels = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.starts_with("#EXTINF:") {
            if let Some(url_line) = lines.get(i + 1).copied().filter(|next| !next.starts_with('#')) {
                match parse_extinf_entry(line, url_line) {
                    Some(channel) => channels.push(channel),
                    // One bad entry never aborts the whole parse
                    None => tracing::warn!("Skipping malformed EXTINF entry: {}", line),
                }
                // The URL line is consumed, not re-scanned as its own entry
                i += 1;
            }
        } else if line.starts_with("http") && !line.contains("#EXT") {
            channels.push(ParsedChannel {
                name: format!("Channel {}", channels.len() + 1),
                url: line.to_string(),
                logo: None,
                group: DEFAULT_GROUP.to_string(),
                language: None,
                country: None,
            });
        }

        i += 1;
    }

    channels
}

/// Build a channel from an `#EXTINF:` header and its stream URL line.
/// Returns `None` when the pair cannot yield a playable entry.
fn parse_extinf_entry(extinf_line: &str, url_line: &str) -> Option<ParsedChannel> {
    let url = url_line.trim();
    if url.is_empty() {
        return None;
    }

    // Title is whatever follows the last comma; attribute values are
    // quoted, so a comma inside them cannot appear after the closing quote
    let name = extinf_line
        .rfind(',')
        .map(|idx| extinf_line[idx + 1..].replace('"', "").trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Unknown Channel".to_string());

    Some(ParsedChannel {
        name,
        url: url.to_string(),
        logo: extract_attr(extinf_line, &LOGO_REGEX, &LOGO_ALT_REGEX),
        group: extract_attr(extinf_line, &GROUP_REGEX, &GROUP_ALT_REGEX)
            .unwrap_or_else(|| DEFAULT_GROUP.to_string()),
        language: extract_attr(extinf_line, &LANGUAGE_REGEX, &LANGUAGE_ALT_REGEX),
        country: extract_attr(extinf_line, &COUNTRY_REGEX, &COUNTRY_ALT_REGEX),
    })
}

/// Extract a quoted attribute value, preferring the `tvg-` prefixed key.
fn extract_attr(line: &str, primary: &Regex, fallback: &Regex) -> Option<String> {
    primary
        .captures(line)
        .or_else(|| fallback.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().to_string())
}
