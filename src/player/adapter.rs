//! The seam between the engine and its playback mechanisms.

use std::time::Duration;

use thiserror::Error;

use crate::playlist::{SourceKind, Track};

use super::SampleTap;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("no audio output device: {0}")]
    NoOutput(String),
    #[error("could not fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("could not decode {title}: {message}")]
    Decode { title: String, message: String },
    #[error("embedded player is still loading")]
    NotReady,
    #[error("embedded player failed (code {0})")]
    Embedded(u32),
    #[error("track is not playable by this adapter")]
    WrongKind,
}

/// Out-of-band reports from an adapter back to the engine.
#[derive(Debug)]
pub enum AdapterEvent {
    /// The current track played to its natural end.
    Ended(SourceKind),
    /// Playback broke after a successful load.
    Failed { kind: SourceKind, message: String },
    /// The embedded player finished initializing.
    EmbeddedReady,
}

/// A playback mechanism the engine can drive.
///
/// `load` starts the track playing; `position`/`duration` answer with
/// zero and `None` when the adapter has nothing loaded. Volume is a
/// percentage, 0 to 100.
pub trait SourceAdapter {
    fn load(&mut self, track: &Track) -> Result<(), AdapterError>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    /// Seek to a fraction of the track, 0.0 to 1.0.
    fn seek(&mut self, fraction: f64) -> Result<(), AdapterError>;
    fn set_volume(&mut self, volume: u8);
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;

    /// Offer the visualizer tap. Adapters that cannot expose raw
    /// samples decline by returning `false`.
    fn attach_tap(&mut self, tap: SampleTap) -> bool {
        let _ = tap;
        false
    }

    fn detach_tap(&mut self) {}

    /// Called every engine tick; adapters surface end-of-track and
    /// deferred signals here.
    fn poll(&mut self) {}
}
