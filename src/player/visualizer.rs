//! Sample tap and spectrum analysis for the visualizer pane.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::{ChannelCount, SampleRate, Source};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// How many recent samples the tap retains.
pub const TAP_CAPACITY: usize = 8192;

/// FFT window size; the spectrum has half as many usable bins.
pub const SPECTRUM_POINTS: usize = 256;
pub const SPECTRUM_BINS: usize = SPECTRUM_POINTS / 2;

/// A shared ring of the most recent playback samples.
///
/// The audio mixer thread pushes through [`TapSource`]; the UI thread
/// reads snapshots. Pushes use `try_lock` so the mixer never blocks on
/// a slow frame.
#[derive(Clone, Default)]
pub struct SampleTap {
    buf: Arc<Mutex<VecDeque<f32>>>,
}

impl SampleTap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, sample: f32) {
        if let Ok(mut buf) = self.buf.try_lock() {
            if buf.len() == TAP_CAPACITY {
                buf.pop_front();
            }
            buf.push_back(sample);
        }
    }

    /// The newest `SPECTRUM_POINTS` samples, oldest first. Empty when
    /// nothing has played yet.
    pub fn snapshot(&self) -> Vec<f32> {
        let buf = self.buf.lock().unwrap();
        let skip = buf.len().saturating_sub(SPECTRUM_POINTS);
        buf.iter().skip(skip).copied().collect()
    }

    pub fn clear(&self) {
        self.buf.lock().unwrap().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().unwrap().is_empty()
    }
}

/// A pass-through `rodio` source that copies every sample into a
/// [`SampleTap`] on its way to the mixer.
pub struct TapSource<S> {
    inner: S,
    tap: SampleTap,
}

impl<S> TapSource<S> {
    pub fn new(inner: S, tap: SampleTap) -> Self {
        Self { inner, tap }
    }
}

impl<S> Iterator for TapSource<S>
where
    S: Source,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.inner.next();
        if let Some(s) = sample {
            self.tap.push(s);
        }
        sample
    }
}

impl<S> Source for TapSource<S>
where
    S: Source,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> ChannelCount {
        self.inner.channels()
    }

    fn sample_rate(&self) -> SampleRate {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

/// Magnitude spectrum of the tap's newest window: `SPECTRUM_BINS`
/// normalized values, all zero when the tap is silent or empty.
pub fn spectrum(tap: &SampleTap) -> Vec<f32> {
    let samples = tap.snapshot();
    if samples.is_empty() {
        return vec![0.0; SPECTRUM_BINS];
    }

    // Hann window over a zero-padded frame.
    let mut frame: Vec<Complex<f32>> = (0..SPECTRUM_POINTS)
        .map(|i| {
            let s = samples.get(i).copied().unwrap_or(0.0);
            let w = 0.5
                - 0.5
                    * (2.0 * std::f32::consts::PI * i as f32 / (SPECTRUM_POINTS - 1) as f32).cos();
            Complex::new(s * w, 0.0)
        })
        .collect();

    FftPlanner::new()
        .plan_fft_forward(SPECTRUM_POINTS)
        .process(&mut frame);

    frame
        .iter()
        .take(SPECTRUM_BINS)
        .map(|c| c.norm() / SPECTRUM_POINTS as f32)
        .collect()
}
