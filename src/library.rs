//! The durable music library.
//!
//! Only local-file tracks live here. Records go through a narrow keyed
//! store ([`LibraryStore`]: `add` one record, `get_all` at startup) so the
//! storage backend stays swappable; the shipped backend is a JSON file in
//! the user data directory.

mod import;
mod store;
mod views;

pub use import::*;
pub use store::*;
pub use views::*;

use crate::playlist::{Track, TrackId, TrackSource};

/// Turn a stored library record into a playable track. Library ids are
/// namespaced so they can never collide with session-scoped stream or
/// embedded ids in the playlist.
pub fn local_track(stored: &StoredTrack) -> Track {
    Track {
        id: TrackId::new(format!("local-{}", stored.id)),
        title: stored.record.title.clone(),
        artist: stored.record.artist.clone(),
        album: stored.record.album.clone(),
        genre: stored.record.genre.clone(),
        source: TrackSource::Local {
            path: stored.record.path.clone(),
        },
    }
}
