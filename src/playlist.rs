//! Playlist and track model.
//!
//! A [`Track`] is one playable unit from one of three sources (local file,
//! remote stream, embedded video). The [`Playlist`] is the active ordered
//! sequence of tracks together with the "now playing" cursor.

mod model;
mod parse;

pub use model::*;
pub use parse::*;
