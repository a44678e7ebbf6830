//! Adapter around the embedded third-party video player.
//!
//! The embedded player is asynchronous and only becomes usable after it
//! signals readiness. Until then loads fail with
//! [`AdapterError::NotReady`], position and duration answer zero, and
//! volume changes are held and applied on the ready signal.

use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use tracing::{debug, warn};

use crate::playlist::{SourceKind, Track, TrackSource};

use super::{AdapterError, AdapterEvent, SourceAdapter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddedState {
    Playing,
    Paused,
    Ended,
}

/// Raw signals the embedded player backend emits.
#[derive(Debug)]
pub enum EmbeddedSignal {
    Ready,
    StateChanged(EmbeddedState),
    Error(u32),
}

/// The control surface a concrete embedded player backend exposes.
pub trait EmbeddedPlayer: Send {
    fn load_by_id(&mut self, video_id: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek_to(&mut self, position: Duration);
    fn set_volume(&mut self, volume: u8);
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
}

/// Backend used when no embedded player is wired up. It never signals
/// ready, so embedded tracks report "still loading" instead of playing
/// silence.
#[derive(Default)]
pub struct DetachedPlayer;

impl EmbeddedPlayer for DetachedPlayer {
    fn load_by_id(&mut self, _video_id: &str) {}
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn stop(&mut self) {}
    fn seek_to(&mut self, _position: Duration) {}
    fn set_volume(&mut self, _volume: u8) {}

    fn position(&self) -> Duration {
        Duration::ZERO
    }

    fn duration(&self) -> Option<Duration> {
        None
    }
}

pub struct EmbeddedAdapter {
    player: Box<dyn EmbeddedPlayer>,
    signals: Receiver<EmbeddedSignal>,
    events: Sender<AdapterEvent>,
    ready: bool,
    loaded: bool,
    pending_volume: Option<u8>,
}

impl EmbeddedAdapter {
    pub fn new(
        player: Box<dyn EmbeddedPlayer>,
        signals: Receiver<EmbeddedSignal>,
        events: Sender<AdapterEvent>,
    ) -> Self {
        Self {
            player,
            signals,
            events,
            ready: false,
            loaded: false,
            pending_volume: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn emit(&self, event: AdapterEvent) {
        if self.events.send(event).is_err() {
            warn!("engine dropped the adapter event channel");
        }
    }
}

impl SourceAdapter for EmbeddedAdapter {
    fn load(&mut self, track: &Track) -> Result<(), AdapterError> {
        let TrackSource::Embedded { video_id, .. } = &track.source else {
            return Err(AdapterError::WrongKind);
        };
        if !self.ready {
            return Err(AdapterError::NotReady);
        }
        debug!(video_id, "loading embedded track");
        self.player.load_by_id(video_id);
        self.player.play();
        self.loaded = true;
        Ok(())
    }

    fn pause(&mut self) {
        if self.ready {
            self.player.pause();
        }
    }

    fn resume(&mut self) {
        if self.ready {
            self.player.play();
        }
    }

    fn stop(&mut self) {
        if self.ready {
            self.player.stop();
        }
        self.loaded = false;
    }

    fn seek(&mut self, fraction: f64) -> Result<(), AdapterError> {
        if !self.ready {
            return Err(AdapterError::NotReady);
        }
        let Some(total) = self.player.duration() else {
            return Ok(());
        };
        self.player.seek_to(total.mul_f64(fraction.clamp(0.0, 1.0)));
        Ok(())
    }

    /// Mirrored on every engine volume change; the backend only hears
    /// about it once it is ready.
    fn set_volume(&mut self, volume: u8) {
        let volume = volume.min(100);
        if self.ready {
            self.player.set_volume(volume);
        } else {
            self.pending_volume = Some(volume);
        }
    }

    fn position(&self) -> Duration {
        if self.ready && self.loaded {
            self.player.position()
        } else {
            Duration::ZERO
        }
    }

    fn duration(&self) -> Option<Duration> {
        if self.ready && self.loaded {
            self.player.duration()
        } else {
            None
        }
    }

    fn poll(&mut self) {
        while let Ok(signal) = self.signals.try_recv() {
            match signal {
                EmbeddedSignal::Ready => {
                    self.ready = true;
                    if let Some(volume) = self.pending_volume.take() {
                        self.player.set_volume(volume);
                    }
                    self.emit(AdapterEvent::EmbeddedReady);
                }
                EmbeddedSignal::StateChanged(EmbeddedState::Ended) => {
                    self.loaded = false;
                    self.emit(AdapterEvent::Ended(SourceKind::Embedded));
                }
                EmbeddedSignal::StateChanged(state) => {
                    debug!(?state, "embedded player state change");
                }
                EmbeddedSignal::Error(code) => {
                    self.loaded = false;
                    self.emit(AdapterEvent::Failed {
                        kind: SourceKind::Embedded,
                        message: AdapterError::Embedded(code).to_string(),
                    });
                }
            }
        }
    }
}
