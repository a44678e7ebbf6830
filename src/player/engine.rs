//! The playback engine: playlist cursor, state machine, adapter switching.

use std::time::Duration;

use tracing::{info, warn};

use crate::playlist::{Playlist, SourceKind, Track, TrackSource};

use super::{AdapterError, AdapterEvent, SampleTap, SourceAdapter};

pub const MAX_VOLUME: u8 = 100;
pub const VOLUME_STEP: u8 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// What external surfaces (MPRIS, the terminal title) get told about
/// the current track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackMeta {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub art_url: Option<String>,
}

impl TrackMeta {
    pub fn from_track(track: &Track) -> Self {
        let art_url = match &track.source {
            TrackSource::Embedded { video_id, .. } => {
                Some(format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg"))
            }
            _ => None,
        };
        Self {
            title: track.title.clone(),
            artist: track.artist.clone().unwrap_or_default(),
            album: track.album.clone().unwrap_or_default(),
            art_url,
        }
    }
}

/// A now-playing surface the engine publishes to on track and state
/// changes.
pub trait NowPlaying {
    fn now_playing(&self, meta: &TrackMeta);
    fn playback_changed(&self, state: PlaybackState);
}

pub struct Player {
    playlist: Playlist,
    state: PlaybackState,
    volume: u8,
    local: Box<dyn SourceAdapter>,
    embedded: Box<dyn SourceAdapter>,
    display: Box<dyn NowPlaying>,
    tap: SampleTap,
    /// Which adapter currently holds a track, if any.
    active_kind: Option<SourceKind>,
    notices: Vec<String>,
}

impl Player {
    pub fn new(
        local: Box<dyn SourceAdapter>,
        embedded: Box<dyn SourceAdapter>,
        display: Box<dyn NowPlaying>,
        volume: u8,
    ) -> Self {
        let mut player = Self {
            playlist: Playlist::new(),
            state: PlaybackState::Stopped,
            volume: volume.min(MAX_VOLUME),
            local,
            embedded,
            display,
            tap: SampleTap::new(),
            active_kind: None,
            notices: Vec::new(),
        };
        // Both adapters start at the configured volume, ready or not.
        let v = player.volume;
        player.local.set_volume(v);
        player.embedded.set_volume(v);
        player
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn tap(&self) -> &SampleTap {
        &self.tap
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.current()
    }

    /// Drain user-facing messages accumulated since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn notice(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    pub fn append(&mut self, track: Track) -> usize {
        self.playlist.append(track)
    }

    /// Append unless the id is already queued. Returns whether it was
    /// added; the caller decides how to phrase the duplicate notice.
    pub fn append_unique(&mut self, track: Track) -> bool {
        self.playlist.append_unique(track)
    }

    fn adapter_for(&mut self, kind: SourceKind) -> &mut Box<dyn SourceAdapter> {
        match kind {
            SourceKind::Local | SourceKind::Stream => &mut self.local,
            SourceKind::Embedded => &mut self.embedded,
        }
    }

    fn stop_active(&mut self) {
        if let Some(kind) = self.active_kind.take() {
            let adapter = self.adapter_for(kind);
            adapter.detach_tap();
            adapter.stop();
        }
    }

    /// Load and start the track under the cursor, switching adapters as
    /// needed. On failure the engine advances and retries until it has
    /// tried every track once.
    fn start_current(&mut self, attempts: usize) {
        let Some(track) = self.playlist.current().cloned() else {
            self.enter_stopped();
            return;
        };
        let kind = track.source.kind();

        self.stop_active();

        let tap = self.tap.clone();
        let volume = self.volume;
        let adapter = self.adapter_for(kind);
        // Adapters without raw sample access simply decline the tap.
        let _ = adapter.attach_tap(tap);
        adapter.set_volume(volume);

        match adapter.load(&track) {
            Ok(()) => {
                self.active_kind = Some(kind);
                self.state = PlaybackState::Playing;
                info!(title = %track.title, ?kind, "now playing");
                let meta = TrackMeta::from_track(&track);
                self.display.now_playing(&meta);
                self.display.playback_changed(PlaybackState::Playing);
            }
            Err(AdapterError::NotReady) => {
                // Not a broken track; keep the cursor so play can be
                // retried once the embedded player is up.
                self.notice("Embedded player is still loading, try again shortly");
                self.enter_stopped();
            }
            Err(e) => {
                warn!(title = %track.title, "track failed to start: {e}");
                self.notice(format!("Could not play \"{}\": {e}", track.title));
                if attempts + 1 < self.playlist.len() {
                    self.playlist.advance();
                    self.start_current(attempts + 1);
                } else {
                    // Every track failed this cycle; stop instead of spinning.
                    self.enter_stopped();
                }
            }
        }
    }

    fn enter_stopped(&mut self) {
        self.stop_active();
        if self.state != PlaybackState::Stopped {
            self.state = PlaybackState::Stopped;
            self.display.playback_changed(PlaybackState::Stopped);
        } else {
            self.state = PlaybackState::Stopped;
        }
    }

    /// Jump to a playlist index and start it.
    pub fn select_track(&mut self, index: usize) {
        if self.playlist.select(index).is_none() {
            return;
        }
        self.start_current(0);
    }

    pub fn toggle_play_pause(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                if let Some(kind) = self.active_kind {
                    self.adapter_for(kind).pause();
                }
                self.state = PlaybackState::Paused;
                self.display.playback_changed(PlaybackState::Paused);
            }
            PlaybackState::Paused => {
                if let Some(kind) = self.active_kind {
                    self.adapter_for(kind).resume();
                }
                self.state = PlaybackState::Playing;
                self.display.playback_changed(PlaybackState::Playing);
            }
            PlaybackState::Stopped => {
                if self.playlist.is_empty() {
                    return;
                }
                if self.playlist.cursor().is_none() {
                    self.playlist.advance();
                }
                self.start_current(0);
            }
        }
    }

    pub fn next(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        self.playlist.advance();
        self.start_current(0);
    }

    pub fn previous(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        self.playlist.retreat();
        self.start_current(0);
    }

    pub fn stop(&mut self) {
        self.enter_stopped();
    }

    /// Remove a playlist entry. Removing the playing track stops
    /// playback; the cursor rules live in [`Playlist::remove`].
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        let was_current = self.playlist.cursor() == Some(index);
        let removed = self.playlist.remove(index)?;
        if was_current {
            self.enter_stopped();
        }
        Some(removed)
    }

    /// Volume is always mirrored to both adapters so an adapter switch
    /// never changes loudness.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(MAX_VOLUME);
        let v = self.volume;
        self.local.set_volume(v);
        self.embedded.set_volume(v);
    }

    pub fn volume_up(&mut self) {
        self.set_volume(self.volume.saturating_add(VOLUME_STEP));
    }

    pub fn volume_down(&mut self) {
        self.set_volume(self.volume.saturating_sub(VOLUME_STEP));
    }

    pub fn seek(&mut self, fraction: f64) {
        let Some(kind) = self.active_kind else { return };
        if let Err(e) = self.adapter_for(kind).seek(fraction) {
            self.notice(format!("Seek failed: {e}"));
        }
    }

    /// Elapsed time and total duration of whatever is loaded.
    pub fn progress(&self) -> (Duration, Option<Duration>) {
        match self.active_kind {
            Some(SourceKind::Local) | Some(SourceKind::Stream) => {
                (self.local.position(), self.local.duration())
            }
            Some(SourceKind::Embedded) => {
                (self.embedded.position(), self.embedded.duration())
            }
            None => (Duration::ZERO, None),
        }
    }

    /// Give both adapters a tick; they report through the event channel.
    pub fn poll(&mut self) {
        self.local.poll();
        self.embedded.poll();
    }

    pub fn handle_event(&mut self, event: AdapterEvent) {
        match event {
            AdapterEvent::Ended(kind) => {
                if self.active_kind == Some(kind) {
                    self.active_kind = None;
                    self.playlist.advance();
                    self.start_current(0);
                }
            }
            AdapterEvent::Failed { kind, message } => {
                if self.active_kind == Some(kind) {
                    self.active_kind = None;
                    self.notice(format!("Playback failed: {message}"));
                    self.playlist.advance();
                    self.start_current(1);
                }
            }
            AdapterEvent::EmbeddedReady => {
                self.notice("Embedded player ready");
                let v = self.volume;
                self.embedded.set_volume(v);
            }
        }
    }
}
