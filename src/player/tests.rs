use super::*;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::playlist::{SourceKind, Track, TrackId, TrackSource};

#[derive(Default)]
struct AdapterProbe {
    log: Vec<String>,
    volume: u8,
    tap_attached: bool,
}

/// Scripted adapter: records every call, optionally refuses specific
/// track ids or reports not-ready.
struct FakeAdapter {
    probe: Arc<Mutex<AdapterProbe>>,
    fail: HashSet<String>,
    not_ready: bool,
}

impl FakeAdapter {
    fn new(probe: Arc<Mutex<AdapterProbe>>) -> Self {
        Self {
            probe,
            fail: HashSet::new(),
            not_ready: false,
        }
    }

    fn failing(probe: Arc<Mutex<AdapterProbe>>, ids: &[&str]) -> Self {
        let mut adapter = Self::new(probe);
        adapter.fail = ids.iter().map(|s| s.to_string()).collect();
        adapter
    }
}

impl SourceAdapter for FakeAdapter {
    fn load(&mut self, track: &Track) -> Result<(), AdapterError> {
        let id = track.id.as_str().to_string();
        self.probe.lock().unwrap().log.push(format!("load:{id}"));
        if self.not_ready {
            return Err(AdapterError::NotReady);
        }
        if self.fail.contains(&id) {
            return Err(AdapterError::Decode {
                title: track.title.clone(),
                message: "bad frame".to_string(),
            });
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.lock().unwrap().log.push("pause".to_string());
    }

    fn resume(&mut self) {
        self.probe.lock().unwrap().log.push("resume".to_string());
    }

    fn stop(&mut self) {
        self.probe.lock().unwrap().log.push("stop".to_string());
    }

    fn seek(&mut self, fraction: f64) -> Result<(), AdapterError> {
        self.probe
            .lock()
            .unwrap()
            .log
            .push(format!("seek:{fraction:.2}"));
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) {
        self.probe.lock().unwrap().volume = volume;
    }

    fn position(&self) -> Duration {
        Duration::from_secs(3)
    }

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs(60))
    }

    fn attach_tap(&mut self, _tap: SampleTap) -> bool {
        self.probe.lock().unwrap().tap_attached = true;
        true
    }

    fn detach_tap(&mut self) {
        self.probe.lock().unwrap().tap_attached = false;
    }
}

#[derive(Default)]
struct DisplayProbe {
    log: Mutex<Vec<String>>,
}

struct FakeDisplay(Arc<DisplayProbe>);

impl NowPlaying for FakeDisplay {
    fn now_playing(&self, meta: &TrackMeta) {
        self.0
            .log
            .lock()
            .unwrap()
            .push(format!("track:{}", meta.title));
    }

    fn playback_changed(&self, state: PlaybackState) {
        self.0.log.lock().unwrap().push(format!("state:{state:?}"));
    }
}

fn local(id: &str) -> Track {
    Track {
        id: TrackId::new(id),
        title: id.to_string(),
        artist: Some("Artist".to_string()),
        album: None,
        genre: None,
        source: TrackSource::Local {
            path: PathBuf::from(format!("/music/{id}.mp3")),
        },
    }
}

fn embedded(id: &str) -> Track {
    Track::embedded(id, format!("https://www.youtube.com/watch?v={id}"))
}

struct Rig {
    player: Player,
    local: Arc<Mutex<AdapterProbe>>,
    embedded: Arc<Mutex<AdapterProbe>>,
    display: Arc<DisplayProbe>,
}

fn rig_with(local_adapter: FakeAdapter, embedded_adapter: FakeAdapter, rig_probes: (Arc<Mutex<AdapterProbe>>, Arc<Mutex<AdapterProbe>>)) -> Rig {
    let display = Arc::new(DisplayProbe::default());
    let player = Player::new(
        Box::new(local_adapter),
        Box::new(embedded_adapter),
        Box::new(FakeDisplay(Arc::clone(&display))),
        80,
    );
    Rig {
        player,
        local: rig_probes.0,
        embedded: rig_probes.1,
        display,
    }
}

fn rig() -> Rig {
    let local_probe = Arc::new(Mutex::new(AdapterProbe::default()));
    let embedded_probe = Arc::new(Mutex::new(AdapterProbe::default()));
    rig_with(
        FakeAdapter::new(Arc::clone(&local_probe)),
        FakeAdapter::new(Arc::clone(&embedded_probe)),
        (local_probe, embedded_probe),
    )
}

#[test]
fn select_track_starts_playback_and_publishes_now_playing() {
    let mut r = rig();
    r.player.append(local("a"));
    r.player.append(local("b"));

    r.player.select_track(1);

    assert_eq!(r.player.state(), PlaybackState::Playing);
    let probe = r.local.lock().unwrap();
    assert!(probe.log.contains(&"load:b".to_string()));
    assert!(probe.tap_attached);

    let display = r.display.log.lock().unwrap();
    assert!(display.contains(&"track:b".to_string()));
    assert!(display.contains(&"state:Playing".to_string()));
}

#[test]
fn toggle_from_stopped_starts_the_first_track() {
    let mut r = rig();
    r.player.append(local("a"));
    r.player.append(local("b"));

    r.player.toggle_play_pause();
    assert_eq!(r.player.state(), PlaybackState::Playing);
    assert_eq!(r.player.playlist().cursor(), Some(0));
}

#[test]
fn toggle_pauses_and_resumes_without_reloading() {
    let mut r = rig();
    r.player.append(local("a"));
    r.player.select_track(0);

    r.player.toggle_play_pause();
    assert_eq!(r.player.state(), PlaybackState::Paused);
    r.player.toggle_play_pause();
    assert_eq!(r.player.state(), PlaybackState::Playing);

    let probe = r.local.lock().unwrap();
    let loads = probe.log.iter().filter(|l| l.starts_with("load:")).count();
    assert_eq!(loads, 1);
    assert!(probe.log.contains(&"pause".to_string()));
    assert!(probe.log.contains(&"resume".to_string()));
}

#[test]
fn switching_source_kinds_stops_the_old_adapter_first() {
    let mut r = rig();
    // The embedded adapter in this rig is "ready" (fake never refuses).
    r.player.append(local("a"));
    r.player.append(embedded("dQw4w9WgXcQ"));

    r.player.select_track(0);
    r.player.next();

    let local_probe = r.local.lock().unwrap();
    assert!(local_probe.log.contains(&"stop".to_string()));
    assert!(!local_probe.tap_attached);

    let embedded_probe = r.embedded.lock().unwrap();
    assert!(embedded_probe.log.contains(&"load:dQw4w9WgXcQ".to_string()));
}

#[test]
fn wrap_around_next_returns_to_the_first_track() {
    let mut r = rig();
    r.player.append(local("a"));
    r.player.append(local("b"));

    r.player.select_track(1);
    r.player.next();
    assert_eq!(r.player.playlist().cursor(), Some(0));
    assert_eq!(r.player.state(), PlaybackState::Playing);
}

#[test]
fn volume_mirrors_to_both_adapters_and_clamps() {
    let mut r = rig();
    r.player.set_volume(200);
    assert_eq!(r.player.volume(), MAX_VOLUME);
    assert_eq!(r.local.lock().unwrap().volume, MAX_VOLUME);
    assert_eq!(r.embedded.lock().unwrap().volume, MAX_VOLUME);

    r.player.volume_down();
    assert_eq!(r.player.volume(), MAX_VOLUME - VOLUME_STEP);
    assert_eq!(r.embedded.lock().unwrap().volume, MAX_VOLUME - VOLUME_STEP);
}

#[test]
fn removing_the_playing_track_stops_playback() {
    let mut r = rig();
    r.player.append(local("a"));
    r.player.append(local("b"));
    r.player.select_track(0);

    r.player.remove(0);
    assert_eq!(r.player.state(), PlaybackState::Stopped);
    assert_eq!(r.player.playlist().cursor(), None);
    assert_eq!(r.player.playlist().len(), 1);
}

#[test]
fn removing_another_track_keeps_playing() {
    let mut r = rig();
    r.player.append(local("a"));
    r.player.append(local("b"));
    r.player.select_track(1);

    r.player.remove(0);
    assert_eq!(r.player.state(), PlaybackState::Playing);
    assert_eq!(r.player.playlist().cursor(), Some(0));
}

#[test]
fn broken_tracks_auto_advance_to_the_next_playable_one() {
    let local_probe = Arc::new(Mutex::new(AdapterProbe::default()));
    let embedded_probe = Arc::new(Mutex::new(AdapterProbe::default()));
    let mut r = rig_with(
        FakeAdapter::failing(Arc::clone(&local_probe), &["a"]),
        FakeAdapter::new(Arc::clone(&embedded_probe)),
        (local_probe, embedded_probe),
    );
    r.player.append(local("a"));
    r.player.append(local("b"));

    r.player.select_track(0);
    assert_eq!(r.player.state(), PlaybackState::Playing);
    assert_eq!(r.player.playlist().cursor(), Some(1));
    assert!(!r.player.take_notices().is_empty());
}

#[test]
fn all_broken_tracks_stop_after_one_full_cycle() {
    let local_probe = Arc::new(Mutex::new(AdapterProbe::default()));
    let embedded_probe = Arc::new(Mutex::new(AdapterProbe::default()));
    let mut r = rig_with(
        FakeAdapter::failing(Arc::clone(&local_probe), &["a", "b"]),
        FakeAdapter::new(Arc::clone(&embedded_probe)),
        (local_probe, embedded_probe),
    );
    r.player.append(local("a"));
    r.player.append(local("b"));

    r.player.select_track(0);
    assert_eq!(r.player.state(), PlaybackState::Stopped);

    // Each track was attempted exactly once.
    let loads = r
        .local
        .lock()
        .unwrap()
        .log
        .iter()
        .filter(|l| l.starts_with("load:"))
        .count();
    assert_eq!(loads, 2);
}

#[test]
fn ended_event_advances_to_the_next_track() {
    let mut r = rig();
    r.player.append(local("a"));
    r.player.append(local("b"));
    r.player.select_track(0);

    r.player.handle_event(AdapterEvent::Ended(SourceKind::Local));
    assert_eq!(r.player.playlist().cursor(), Some(1));
    assert_eq!(r.player.state(), PlaybackState::Playing);
}

#[test]
fn not_ready_embedded_keeps_the_cursor_for_a_retry() {
    let local_probe = Arc::new(Mutex::new(AdapterProbe::default()));
    let embedded_probe = Arc::new(Mutex::new(AdapterProbe::default()));
    let mut not_ready = FakeAdapter::new(Arc::clone(&embedded_probe));
    not_ready.not_ready = true;
    let mut r = rig_with(
        FakeAdapter::new(Arc::clone(&local_probe)),
        not_ready,
        (local_probe, embedded_probe),
    );
    r.player.append(embedded("dQw4w9WgXcQ"));

    r.player.select_track(0);
    assert_eq!(r.player.state(), PlaybackState::Stopped);
    assert_eq!(r.player.playlist().cursor(), Some(0));
    assert!(!r.player.take_notices().is_empty());
}

#[derive(Default)]
struct EmbeddedProbe {
    log: Vec<String>,
    volume: Option<u8>,
}

struct FakeEmbedded(Arc<Mutex<EmbeddedProbe>>);

impl EmbeddedPlayer for FakeEmbedded {
    fn load_by_id(&mut self, video_id: &str) {
        self.0.lock().unwrap().log.push(format!("load:{video_id}"));
    }

    fn play(&mut self) {
        self.0.lock().unwrap().log.push("play".to_string());
    }

    fn pause(&mut self) {
        self.0.lock().unwrap().log.push("pause".to_string());
    }

    fn stop(&mut self) {
        self.0.lock().unwrap().log.push("stop".to_string());
    }

    fn seek_to(&mut self, position: Duration) {
        self.0
            .lock()
            .unwrap()
            .log
            .push(format!("seek:{}", position.as_secs()));
    }

    fn set_volume(&mut self, volume: u8) {
        self.0.lock().unwrap().volume = Some(volume);
    }

    fn position(&self) -> Duration {
        Duration::from_secs(12)
    }

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs(240))
    }
}

#[test]
fn embedded_adapter_gates_everything_on_readiness() {
    let probe = Arc::new(Mutex::new(EmbeddedProbe::default()));
    let (signal_tx, signal_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let mut adapter = EmbeddedAdapter::new(
        Box::new(FakeEmbedded(Arc::clone(&probe))),
        signal_rx,
        event_tx,
    );

    // Before ready: loads refuse, queries answer zero, volume is held.
    let track = Track::embedded("dQw4w9WgXcQ", "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    assert!(matches!(adapter.load(&track), Err(AdapterError::NotReady)));
    assert_eq!(adapter.position(), Duration::ZERO);
    assert_eq!(adapter.duration(), None);
    adapter.set_volume(40);
    assert_eq!(probe.lock().unwrap().volume, None);

    // Ready: pending volume lands and the event surfaces.
    signal_tx.send(EmbeddedSignal::Ready).unwrap();
    adapter.poll();
    assert!(adapter.is_ready());
    assert_eq!(probe.lock().unwrap().volume, Some(40));
    assert!(matches!(event_rx.try_recv(), Ok(AdapterEvent::EmbeddedReady)));

    adapter.load(&track).unwrap();
    assert_eq!(adapter.position(), Duration::from_secs(12));
    {
        let log = &probe.lock().unwrap().log;
        assert!(log.contains(&"load:dQw4w9WgXcQ".to_string()));
        assert!(log.contains(&"play".to_string()));
    }

    // Seeking maps the fraction onto the reported duration.
    adapter.seek(0.5).unwrap();
    assert!(probe.lock().unwrap().log.contains(&"seek:120".to_string()));

    // Play/pause state changes are informational only.
    signal_tx
        .send(EmbeddedSignal::StateChanged(EmbeddedState::Playing))
        .unwrap();
    signal_tx
        .send(EmbeddedSignal::StateChanged(EmbeddedState::Paused))
        .unwrap();
    adapter.poll();
    assert!(event_rx.try_recv().is_err());

    // End-of-video becomes an engine event.
    signal_tx
        .send(EmbeddedSignal::StateChanged(EmbeddedState::Ended))
        .unwrap();
    adapter.poll();
    assert!(matches!(
        event_rx.try_recv(),
        Ok(AdapterEvent::Ended(SourceKind::Embedded))
    ));

    // Errors become failures with the code attached.
    signal_tx.send(EmbeddedSignal::Error(150)).unwrap();
    adapter.poll();
    match event_rx.try_recv() {
        Ok(AdapterEvent::Failed { kind, message }) => {
            assert_eq!(kind, SourceKind::Embedded);
            assert!(message.contains("150"));
        }
        other => panic!("expected failure event, got {other:?}"),
    }
}

#[test]
fn detached_player_never_becomes_ready() {
    let (_signal_tx, signal_rx) = mpsc::channel();
    let (event_tx, _event_rx) = mpsc::channel();
    let mut adapter = EmbeddedAdapter::new(Box::new(DetachedPlayer), signal_rx, event_tx);
    adapter.poll();
    assert!(!adapter.is_ready());
    assert_eq!(adapter.position(), Duration::ZERO);
}

#[test]
fn sample_tap_keeps_only_the_newest_samples() {
    let tap = SampleTap::new();
    for i in 0..(TAP_CAPACITY + 10) {
        tap.push(i as f32);
    }
    let snapshot = tap.snapshot();
    assert_eq!(snapshot.len(), SPECTRUM_POINTS);
    // The oldest retained sample is capacity + 10 - window.
    assert_eq!(
        snapshot[0],
        (TAP_CAPACITY + 10 - SPECTRUM_POINTS) as f32
    );

    tap.clear();
    assert!(tap.is_empty());
}

#[test]
fn spectrum_is_silent_for_an_empty_tap() {
    let tap = SampleTap::new();
    let bins = spectrum(&tap);
    assert_eq!(bins.len(), SPECTRUM_BINS);
    assert!(bins.iter().all(|&b| b == 0.0));
}

#[test]
fn spectrum_of_a_tone_has_energy() {
    let tap = SampleTap::new();
    for i in 0..SPECTRUM_POINTS {
        let t = i as f32 / SPECTRUM_POINTS as f32;
        tap.push((2.0 * std::f32::consts::PI * 8.0 * t).sin());
    }
    let bins = spectrum(&tap);
    assert!(bins.iter().any(|&b| b > 0.01));
}

#[test]
fn tap_source_copies_samples_through() {
    use rodio::source::SineWave;

    let tap = SampleTap::new();
    let mut source = TapSource::new(SineWave::new(440.0), tap.clone());
    for _ in 0..64 {
        source.next().unwrap();
    }
    assert_eq!(tap.snapshot().len(), 64);
}

mod progressive {
    use crate::player::ProgressiveReader;
    use std::io::{Read, Seek, SeekFrom};

    /// Yields a counting byte pattern forever, like a live broadcast body.
    struct EndlessBody {
        next: u8,
    }

    impl Read for EndlessBody {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            for slot in out.iter_mut() {
                *slot = self.next;
                self.next = self.next.wrapping_add(1);
            }
            Ok(out.len())
        }
    }

    /// Finite body delivered three bytes at a time.
    struct TricklingBody {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for TricklingBody {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            let n = out.len().min(3).min(self.data.len() - self.pos);
            out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn endless_body_reads_without_waiting_for_eof() {
        let mut reader = ProgressiveReader::new(EndlessBody { next: 0 });

        let mut buf = [0u8; 16];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf[..4], [0, 1, 2, 3]);

        // Length stays unknown while the body is still flowing.
        assert!(reader.seek(SeekFrom::End(0)).is_err());

        // Short backward seeks replay the buffered window.
        reader.seek(SeekFrom::Start(4)).unwrap();
        let mut again = [0u8; 4];
        reader.read_exact(&mut again).unwrap();
        assert_eq!(again, [4, 5, 6, 7]);
    }

    #[test]
    fn finite_body_reaches_eof_and_becomes_end_seekable() {
        let data: Vec<u8> = (0u8..40).collect();
        let mut reader = ProgressiveReader::new(TricklingBody {
            data: data.clone(),
            pos: 0,
        });

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);

        assert_eq!(reader.seek(SeekFrom::End(0)).unwrap(), 40);
        assert_eq!(reader.read(&mut [0u8; 8]).unwrap(), 0);

        reader.seek(SeekFrom::Start(38)).unwrap();
        let mut tail = [0u8; 8];
        let n = reader.read(&mut tail).unwrap();
        assert_eq!(&tail[..n], &[38, 39]);
    }
}

#[test]
fn track_meta_derives_artwork_for_embedded_tracks() {
    let meta = TrackMeta::from_track(&embedded("dQw4w9WgXcQ"));
    assert_eq!(
        meta.art_url.as_deref(),
        Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
    );

    let meta = TrackMeta::from_track(&local("a"));
    assert_eq!(meta.art_url, None);
}
