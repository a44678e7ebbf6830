//! URL-pattern inputs accepted by the player.
//!
//! Three shapes are recognized: a single-video watch link (carrying an
//! 11-character external id), a collection link (everything after `list=`),
//! and a direct audio stream URL (known audio extension). Anything malformed
//! is rejected without touching playlist or library state.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("not a recognizable video URL")]
    NotAVideoUrl,
    #[error("not a recognizable collection URL")]
    NotACollectionUrl,
    #[error("not a direct audio stream URL")]
    NotAStreamUrl,
}

/// Extensions accepted for direct audio streams.
const STREAM_EXTENSIONS: [&str; 4] = ["mp3", "aac", "ogg", "m4a"];

const VIDEO_ID_LEN: usize = 11;

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Canonical watch link for a video id, used when a track was added by
/// id rather than by pasted URL.
pub fn video_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Extract the 11-character video id from a watch or short link.
/// Only the known video hosts are accepted; a `watch?v=` path on some
/// other domain is rejected.
pub fn parse_video_url(url: &str) -> Result<String, ParseError> {
    let url = url.trim();
    let after_marker = [
        "youtube.com/watch?v=",
        "youtu.be/",
        "youtube.com/embed/",
        "youtube.com/v/",
    ]
    .iter()
        .find_map(|marker| url.find(marker).map(|pos| &url[pos + marker.len()..]))
        .ok_or(ParseError::NotAVideoUrl)?;

    let id: String = after_marker.chars().take(VIDEO_ID_LEN).collect();
    if id.len() == VIDEO_ID_LEN && id.chars().all(is_id_char) {
        Ok(id)
    } else {
        Err(ParseError::NotAVideoUrl)
    }
}

/// Extract the collection id: everything after a `list=` query parameter.
pub fn parse_collection_url(url: &str) -> Result<String, ParseError> {
    let url = url.trim();
    let after = ["?list=", "&list="]
        .iter()
        .find_map(|marker| url.find(marker).map(|pos| &url[pos + marker.len()..]))
        .ok_or(ParseError::NotACollectionUrl)?;

    let id: String = after.chars().take_while(|&c| c != '&' && c != '#').collect();
    if !id.is_empty() && id.chars().all(is_id_char) {
        Ok(id)
    } else {
        Err(ParseError::NotACollectionUrl)
    }
}

/// Validate a direct audio stream URL: http(s) and a known audio extension
/// on the path (a query string is allowed).
pub fn parse_stream_url(url: &str) -> Result<String, ParseError> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ParseError::NotAStreamUrl);
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .ok_or(ParseError::NotAStreamUrl)?;

    if STREAM_EXTENSIONS.contains(&ext.as_str()) {
        Ok(url.to_string())
    } else {
        Err(ParseError::NotAStreamUrl)
    }
}
