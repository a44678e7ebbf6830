//! Track and playlist types.

use std::path::PathBuf;

/// Stable identifier of a track within its owning collection.
///
/// Library tracks get store-assigned ids that survive restarts; ad hoc
/// stream/embedded tracks get session-scoped ids derived from the URL or
/// the external video id, which is what makes de-duplication work.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which playback mechanism a track needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    Stream,
    Embedded,
}

/// Where the audio for a track actually comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackSource {
    /// A file on disk; playable only while the path resolves this session.
    Local { path: PathBuf },
    /// An arbitrary remote HTTP(S) locator. We own none of the bytes.
    Stream { url: String },
    /// A third-party video played for its audio through the embedded player.
    Embedded { video_id: String, url: String },
}

impl TrackSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            TrackSource::Local { .. } => SourceKind::Local,
            TrackSource::Stream { .. } => SourceKind::Stream,
            TrackSource::Embedded { .. } => SourceKind::Embedded,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub source: TrackSource,
}

impl Track {
    /// Build an ad hoc stream track from an already-validated URL.
    pub fn stream(url: impl Into<String>) -> Self {
        let url = url.into();
        let title = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("Streaming Audio")
            .to_string();
        Self {
            id: TrackId::new(&url),
            title,
            artist: Some("Remote Stream".to_string()),
            album: Some("Live Stream".to_string()),
            genre: None,
            source: TrackSource::Stream { url },
        }
    }

    /// Build an ad hoc embedded track from an external video id and its
    /// canonical watch link.
    pub fn embedded(video_id: impl Into<String>, url: impl Into<String>) -> Self {
        let video_id = video_id.into();
        Self {
            id: TrackId::new(&video_id),
            title: "Embedded Video".to_string(),
            artist: None,
            album: None,
            genre: Some("Video".to_string()),
            source: TrackSource::Embedded {
                video_id,
                url: url.into(),
            },
        }
    }
}

/// The active, ordered, mutable sequence of tracks being played.
///
/// Insertion order is playback order. The cursor is either `None` (nothing
/// selected) or a valid index into `tracks`.
#[derive(Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    cursor: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The track under the cursor, if any.
    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.iter().any(|t| &t.id == id)
    }

    /// Append a track unconditionally; returns its index.
    pub fn append(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    /// Append a track unless one with the same id is already present.
    /// Returns whether the track was added.
    pub fn append_unique(&mut self, track: Track) -> bool {
        if self.contains(&track.id) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    /// Move the cursor to `index` if it is in range.
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        if index < self.tracks.len() {
            self.cursor = Some(index);
            self.tracks.get(index)
        } else {
            None
        }
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// Remove the track at `index`, keeping the cursor pointing at the same
    /// logical track: removing at the cursor clears it, removing before it
    /// shifts it down by one.
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }
        let removed = self.tracks.remove(index);
        self.cursor = match self.cursor {
            Some(c) if c == index => None,
            Some(c) if c > index => Some(c - 1),
            other => other,
        };
        Some(removed)
    }

    /// Advance the cursor by one, wrapping at the end. No-op on an empty
    /// playlist; from "nothing selected" this lands on index 0.
    pub fn advance(&mut self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        let next = match self.cursor {
            Some(c) => (c + 1) % self.tracks.len(),
            None => 0,
        };
        self.cursor = Some(next);
        Some(next)
    }

    /// Step the cursor back by one, wrapping at the start. No-op on an empty
    /// playlist; from "nothing selected" this lands on the last index.
    pub fn retreat(&mut self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        let len = self.tracks.len();
        let prev = match self.cursor {
            Some(c) => (c + len - 1) % len,
            None => len - 1,
        };
        self.cursor = Some(prev);
        Some(prev)
    }
}
