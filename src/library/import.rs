//! Local-file import: scan a path for audio files and write them into the
//! library store, one record per file.

use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::tag::ItemKey;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::{LibraryStore, StoreError, TrackRecord};

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Read a [`TrackRecord`] from a single audio file, falling back to the
/// file name for the title when there are no usable tags.
fn record_from_file(path: &Path) -> TrackRecord {
    let default_title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();

    let mut title = default_title;
    let mut artist: Option<String> = None;
    let mut album: Option<String> = None;
    let mut genre: Option<String> = None;

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = tag.get_string(&ItemKey::TrackTitle) {
                    if !v.trim().is_empty() {
                        title = v.to_string();
                    }
                }
                if let Some(v) = tag.get_string(&ItemKey::TrackArtist) {
                    let v = v.trim();
                    if !v.is_empty() {
                        artist = Some(v.to_string());
                    }
                }
                if let Some(v) = tag.get_string(&ItemKey::AlbumTitle) {
                    let v = v.trim();
                    if !v.is_empty() {
                        album = Some(v.to_string());
                    }
                }
                if let Some(v) = tag.get_string(&ItemKey::Genre) {
                    let v = v.trim();
                    if !v.is_empty() {
                        genre = Some(v.to_string());
                    }
                }
            }
        }
        Err(e) => warn!(path = %path.display(), "could not read tags: {e}"),
    }

    TrackRecord {
        path: path.to_path_buf(),
        title,
        artist,
        album,
        genre,
    }
}

/// Import every audio file under `dir` into the store. Returns how many
/// records were added.
pub fn import_path(
    dir: &Path,
    settings: &LibrarySettings,
    store: &mut dyn LibraryStore,
) -> Result<usize, StoreError> {
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut added = 0;
    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file()
            && (settings.include_hidden || !is_hidden(path))
            && is_audio_file(path, settings)
        {
            let record = record_from_file(path);
            let id = store.add(record)?;
            debug!(id, path = %path.display(), "imported into library");
            added += 1;
        }
    }

    Ok(added)
}
