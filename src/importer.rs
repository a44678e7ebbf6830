//! Collection import: pull the members of a remote video collection
//! through the gateway and turn them into embedded tracks.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ApiSettings;
use crate::gateway::{Gateway, Request};
use crate::playlist::{video_watch_url, Track};

const PAGE_SIZE: u32 = 50;
const FALLBACK_TITLE: &str = "Video Collection";

/// Member titles the metadata API substitutes for unavailable entries.
const UNAVAILABLE_TITLES: [&str; 2] = ["Private video", "Deleted video"];

#[derive(Debug, Error)]
pub enum ImportError {
    /// No API credential configured; nothing was attempted.
    #[error("no metadata API key configured")]
    MissingCredential,
    /// The import stopped partway. Tracks appended before the failure
    /// stay in the playlist.
    #[error("import aborted after {added} tracks: {reason}")]
    Aborted { added: usize, reason: String },
}

/// Result of a completed collection import.
#[derive(Debug)]
pub struct ImportOutcome {
    pub title: String,
    pub added: usize,
    pub skipped: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionList {
    #[serde(default)]
    items: Vec<CollectionItem>,
}

#[derive(Deserialize)]
struct CollectionItem {
    snippet: CollectionSnippet,
}

#[derive(Deserialize)]
struct CollectionSnippet {
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberList {
    #[serde(default)]
    items: Vec<MemberItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct MemberItem {
    snippet: MemberSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberSnippet {
    title: String,
    video_owner_channel_title: Option<String>,
    resource_id: ResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

fn collection_url(host: &str, key: &str, collection_id: &str) -> String {
    format!("https://{host}/youtube/v3/playlists?part=snippet&id={collection_id}&key={key}")
}

fn members_url(host: &str, key: &str, collection_id: &str, page_token: Option<&str>) -> String {
    let mut url = format!(
        "https://{host}/youtube/v3/playlistItems?part=snippet&maxResults={PAGE_SIZE}&playlistId={collection_id}&key={key}"
    );
    if let Some(token) = page_token {
        url.push_str("&pageToken=");
        url.push_str(token);
    }
    url
}

/// Imports remote collections through the gateway, so repeat imports of
/// the same collection hit the metadata cache.
pub struct Importer {
    gateway: Arc<Gateway>,
    api: ApiSettings,
}

impl Importer {
    pub fn new(gateway: Arc<Gateway>, api: ApiSettings) -> Self {
        Self { gateway, api }
    }

    fn credential(&self) -> Result<&str, ImportError> {
        self.api
            .key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ImportError::MissingCredential)
    }

    fn fetch_json(&self, url: &str, added: usize) -> Result<bytes::Bytes, ImportError> {
        let response = self
            .gateway
            .fetch(&Request::get(url))
            .map_err(|e| ImportError::Aborted {
                added,
                reason: e.to_string(),
            })?;
        if !response.is_success() {
            return Err(ImportError::Aborted {
                added,
                reason: format!("metadata API returned status {}", response.status),
            });
        }
        Ok(response.body)
    }

    /// The collection's own title, or a generic fallback when the
    /// lookup fails. A missing title never blocks an import.
    pub fn collection_title(&self, collection_id: &str) -> Result<String, ImportError> {
        let key = self.credential()?;
        let url = collection_url(&self.api.host, key, collection_id);
        let title = self
            .fetch_json(&url, 0)
            .ok()
            .and_then(|body| serde_json::from_slice::<CollectionList>(&body).ok())
            .and_then(|list| list.items.into_iter().next())
            .map(|item| item.snippet.title)
            .filter(|t| !t.trim().is_empty());
        Ok(title.unwrap_or_else(|| FALLBACK_TITLE.to_string()))
    }

    /// Walk every page of the collection and hand each playable member
    /// to `append`. The callback reports whether the track was actually
    /// added, so duplicates already in the playlist do not inflate the
    /// count.
    pub fn import_collection(
        &self,
        collection_id: &str,
        mut append: impl FnMut(Track) -> bool,
    ) -> Result<ImportOutcome, ImportError> {
        let key = self.credential()?.to_string();
        let title = self.collection_title(collection_id)?;

        let mut added = 0;
        let mut skipped = 0;
        let mut page_token: Option<String> = None;

        loop {
            let url = members_url(&self.api.host, &key, collection_id, page_token.as_deref());
            let body = self.fetch_json(&url, added)?;
            let page: MemberList =
                serde_json::from_slice(&body).map_err(|e| ImportError::Aborted {
                    added,
                    reason: format!("metadata API sent an unreadable page: {e}"),
                })?;

            for item in page.items {
                let member_title = item.snippet.title;
                if UNAVAILABLE_TITLES.contains(&member_title.as_str()) {
                    debug!(title = %member_title, "skipping unavailable collection member");
                    skipped += 1;
                    continue;
                }
                let Some(video_id) = item.snippet.resource_id.video_id else {
                    warn!(title = %member_title, "collection member has no video id");
                    skipped += 1;
                    continue;
                };
                let mut track = Track::embedded(&video_id, video_watch_url(&video_id));
                track.title = member_title;
                track.artist = item
                    .snippet
                    .video_owner_channel_title
                    .filter(|o| !o.trim().is_empty());
                track.album = Some(title.clone());
                if append(track) {
                    added += 1;
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(collection_id, added, skipped, "collection import finished");
        Ok(ImportOutcome {
            title,
            added,
            skipped,
        })
    }
}
