//! Rodio-backed adapter for local files and direct audio streams.
//!
//! Local files are registered in the blob registry and fetched back
//! through the gateway by their `blob:` locator, then decoded from an
//! in-memory cursor, which is what makes `skip_duration`-based seeking
//! cheap to rebuild. Direct stream URLs decode progressively off the
//! live connection instead: the body may never end, so it is neither
//! buffered whole nor cached.

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, warn};

use crate::gateway::{BlobRegistry, Gateway, Request};
use crate::playlist::{SourceKind, Track, TrackSource};

use super::{AdapterError, AdapterEvent, SampleTap, SourceAdapter, TapSource};

pub struct RodioAdapter {
    stream: OutputStream,
    gateway: Arc<Gateway>,
    blobs: Arc<BlobRegistry>,
    events: Sender<AdapterEvent>,

    sink: Option<Sink>,
    bytes: Option<Bytes>,
    blob_url: Option<String>,
    kind: Option<SourceKind>,
    title: String,

    paused: bool,
    started_at: Option<Instant>,
    accumulated: Duration,
    total: Option<Duration>,
    volume: u8,
    tap: Option<SampleTap>,
    ended_sent: bool,
}

impl RodioAdapter {
    pub fn new(
        gateway: Arc<Gateway>,
        blobs: Arc<BlobRegistry>,
        events: Sender<AdapterEvent>,
    ) -> Result<Self, AdapterError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| AdapterError::NoOutput(e.to_string()))?;
        // rodio logs to stderr when the stream drops; noisy under a TUI.
        stream.log_on_drop(false);
        Ok(Self {
            stream,
            gateway,
            blobs,
            events,
            sink: None,
            bytes: None,
            blob_url: None,
            kind: None,
            title: String::new(),
            paused: false,
            started_at: None,
            accumulated: Duration::ZERO,
            total: None,
            volume: 100,
            tap: None,
            ended_sent: false,
        })
    }

    /// Fetch the track's bytes through the gateway. Local files take a
    /// detour through the blob registry so they flow through the same
    /// fetch path as everything else.
    fn fetch_bytes(&mut self, track: &Track) -> Result<Bytes, AdapterError> {
        let url = match &track.source {
            TrackSource::Local { path } => {
                let raw = std::fs::read(path).map_err(|e| AdapterError::Fetch {
                    url: path.display().to_string(),
                    message: e.to_string(),
                })?;
                let url = self.blobs.register(raw, None);
                self.blob_url = Some(url.clone());
                url
            }
            TrackSource::Stream { .. } | TrackSource::Embedded { .. } => {
                return Err(AdapterError::WrongKind);
            }
        };

        let response = self
            .gateway
            .fetch(&Request::get(&url))
            .map_err(|e| AdapterError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            })?;
        if !response.is_success() {
            return Err(AdapterError::Fetch {
                url,
                message: format!("status {}", response.status),
            });
        }
        Ok(response.body)
    }

    /// Build a fresh playing sink from the held bytes, skipped forward
    /// to `start_at`.
    fn build_sink(&mut self, start_at: Duration) -> Result<Sink, AdapterError> {
        let bytes = self.bytes.clone().ok_or(AdapterError::WrongKind)?;
        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|e| AdapterError::Decode {
                title: self.title.clone(),
                message: e.to_string(),
            })?
            .skip_duration(start_at);

        if self.total.is_none() {
            self.total = source.total_duration();
        }

        Ok(self.new_sink(source))
    }

    /// Open a direct stream URL and decode it as the bytes arrive.
    fn open_stream(&mut self, url: String) -> Result<Sink, AdapterError> {
        // The blocking client's default timeout covers the whole body
        // read; a continuous stream never ends, so it must be disabled.
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| AdapterError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            })?;
        let response = client
            .get(&url)
            .send()
            .map_err(|e| AdapterError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AdapterError::Fetch {
                url,
                message: format!("status {}", response.status().as_u16()),
            });
        }

        let source = Decoder::builder()
            .with_data(ProgressiveReader::new(response))
            .with_seekable(false)
            .build()
            .map_err(|e| AdapterError::Decode {
                title: self.title.clone(),
                message: e.to_string(),
            })?;
        // None for live streams; finite files served as streams report one.
        self.total = source.total_duration();
        Ok(self.new_sink(source))
    }

    fn new_sink<S>(&self, source: S) -> Sink
    where
        S: Source + Send + 'static,
    {
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume as f32 / 100.0);
        match &self.tap {
            Some(tap) => sink.append(TapSource::new(source, tap.clone())),
            None => sink.append(source),
        }
        sink
    }

    fn release_blob(&mut self) {
        if let Some(url) = self.blob_url.take() {
            self.blobs.revoke(&url);
        }
    }
}

impl SourceAdapter for RodioAdapter {
    fn load(&mut self, track: &Track) -> Result<(), AdapterError> {
        self.stop();
        self.title = track.title.clone();
        self.total = None;

        let sink = match &track.source {
            TrackSource::Stream { url } => self.open_stream(url.clone())?,
            _ => {
                let bytes = self.fetch_bytes(track)?;
                debug!(title = %self.title, bytes = bytes.len(), "fetched track body");
                self.bytes = Some(bytes);
                match self.build_sink(Duration::ZERO) {
                    Ok(sink) => sink,
                    Err(e) => {
                        self.bytes = None;
                        self.release_blob();
                        return Err(e);
                    }
                }
            }
        };
        sink.play();

        self.sink = Some(sink);
        self.kind = Some(track.source.kind());
        self.paused = false;
        self.started_at = Some(Instant::now());
        self.accumulated = Duration::ZERO;
        self.ended_sent = false;
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        if let Some(started) = self.started_at.take() {
            self.accumulated += started.elapsed();
        }
        self.paused = true;
    }

    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.release_blob();
        self.bytes = None;
        self.kind = None;
        self.paused = false;
        self.started_at = None;
        self.accumulated = Duration::ZERO;
        self.total = None;
        self.ended_sent = false;
        if let Some(tap) = &self.tap {
            tap.clear();
        }
    }

    fn seek(&mut self, fraction: f64) -> Result<(), AdapterError> {
        if self.sink.is_none() || self.bytes.is_none() {
            // No held bytes means a progressive stream; it cannot rewind.
            return Ok(());
        }
        let Some(total) = self.total else {
            // Unknown length (some streams): nothing sane to seek to.
            return Ok(());
        };
        let target = total.mul_f64(fraction.clamp(0.0, 1.0));

        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        let sink = self.build_sink(target)?;
        if self.paused {
            sink.pause();
            self.started_at = None;
        } else {
            sink.play();
            self.started_at = Some(Instant::now());
        }
        self.sink = Some(sink);
        self.accumulated = target;
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume as f32 / 100.0);
        }
    }

    fn position(&self) -> Duration {
        let elapsed = self.accumulated
            + self
                .started_at
                .map_or(Duration::ZERO, |started| started.elapsed());
        match self.total {
            Some(total) => elapsed.min(total),
            None => elapsed,
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.total
    }

    fn attach_tap(&mut self, tap: SampleTap) -> bool {
        self.tap = Some(tap);
        true
    }

    fn detach_tap(&mut self) {
        self.tap = None;
    }

    fn poll(&mut self) {
        let Some(sink) = &self.sink else { return };
        if !self.paused && sink.empty() && !self.ended_sent {
            self.ended_sent = true;
            let kind = self.kind.unwrap_or(SourceKind::Local);
            if self.events.send(AdapterEvent::Ended(kind)).is_err() {
                warn!("engine dropped the adapter event channel");
            }
        }
    }
}

const STREAM_CHUNK: usize = 8 * 1024;
const STREAM_KEEP: u64 = 1024 * 1024;

/// Adapts a body still in flight into the `Read + Seek` shape the
/// decoder wants. Bytes are pulled on demand and a trailing window of
/// `STREAM_KEEP` bytes stays buffered so the decoder's short backward
/// seeks succeed. Seeking from the end fails until EOF is reached.
pub(crate) struct ProgressiveReader {
    inner: Mutex<Box<dyn Read + Send>>,
    buf: Vec<u8>,
    /// Stream offset of `buf[0]`.
    base: u64,
    pos: u64,
    eof: bool,
}

impl ProgressiveReader {
    pub(crate) fn new(inner: impl Read + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Box::new(inner)),
            buf: Vec::new(),
            base: 0,
            pos: 0,
            eof: false,
        }
    }

    fn end(&self) -> u64 {
        self.base + self.buf.len() as u64
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; STREAM_CHUNK];
        let n = self.inner.lock().unwrap().read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    fn trim(&mut self) {
        let keep_from = self.pos.saturating_sub(STREAM_KEEP);
        if keep_from > self.base {
            self.buf.drain(..(keep_from - self.base) as usize);
            self.base = keep_from;
        }
    }
}

impl Read for ProgressiveReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.end() && !self.eof {
            self.fill()?;
        }
        if self.pos >= self.end() {
            return Ok(0);
        }
        let start = (self.pos - self.base) as usize;
        let n = out.len().min(self.buf.len() - start);
        out[..n].copy_from_slice(&self.buf[start..start + n]);
        self.pos += n as u64;
        self.trim();
        Ok(n)
    }
}

impl Seek for ProgressiveReader {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        let target = match from {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "seek before stream start")
            })?,
            SeekFrom::End(delta) => {
                if !self.eof {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        "stream length unknown",
                    ));
                }
                self.end().checked_add_signed(delta).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek before stream start")
                })?
            }
        };
        if target < self.base {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "seek target was already discarded",
            ));
        }
        while target > self.end() && !self.eof {
            self.fill()?;
        }
        self.pos = target;
        Ok(self.pos)
    }
}
