//! Library groupings for the library pane: all songs, or grouped by
//! album / artist / genre with "Unknown …" buckets for untagged files.

use crate::playlist::Track;

pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_GENRE: &str = "Unknown Genre";

fn distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = values.collect();
    out.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
    out.dedup();
    out
}

pub fn albums(tracks: &[Track]) -> Vec<String> {
    distinct(
        tracks
            .iter()
            .map(|t| t.album.clone().unwrap_or_else(|| UNKNOWN_ALBUM.to_string())),
    )
}

pub fn artists(tracks: &[Track]) -> Vec<String> {
    distinct(
        tracks
            .iter()
            .map(|t| t.artist.clone().unwrap_or_else(|| UNKNOWN_ARTIST.to_string())),
    )
}

pub fn genres(tracks: &[Track]) -> Vec<String> {
    distinct(
        tracks
            .iter()
            .map(|t| t.genre.clone().unwrap_or_else(|| UNKNOWN_GENRE.to_string())),
    )
}

pub fn by_album<'a>(tracks: &'a [Track], album: &str) -> Vec<&'a Track> {
    tracks
        .iter()
        .filter(|t| t.album.as_deref().unwrap_or(UNKNOWN_ALBUM) == album)
        .collect()
}

pub fn by_artist<'a>(tracks: &'a [Track], artist: &str) -> Vec<&'a Track> {
    tracks
        .iter()
        .filter(|t| t.artist.as_deref().unwrap_or(UNKNOWN_ARTIST) == artist)
        .collect()
}

pub fn by_genre<'a>(tracks: &'a [Track], genre: &str) -> Vec<&'a Track> {
    tracks
        .iter()
        .filter(|t| t.genre.as_deref().unwrap_or(UNKNOWN_GENRE) == genre)
        .collect()
}
