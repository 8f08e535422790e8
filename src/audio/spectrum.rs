use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::decode::AudioData;

/// Anything that can hand the tracker a byte spectrum for a playback position.
pub trait SpectralFrameSource {
    fn bin_count(&self) -> usize;

    /// Spectrum of the audio just before `position` seconds.
    fn frame_at(&mut self, position: f64) -> &[u8];
}

#[derive(Clone, Copy, Debug)]
pub struct AnalyserSettings {
    pub fft_size: usize,
    /// Weight of the previous frame in the time smoothing (0 disables it).
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

/// Byte-scaled magnitude spectrum in the style of a browser analyser node:
/// Blackman-windowed FFT of the most recent block, smoothed over time,
/// converted to decibels and mapped onto 0..=255.
pub struct ByteSpectrumAnalyser {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    settings: AnalyserSettings,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl ByteSpectrumAnalyser {
    pub fn new(audio: &AudioData, settings: AnalyserSettings) -> Self {
        let n = settings.fft_size;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);

        log::info!(
            "Analyser: fft_size={} ({} bins), smoothing={:.2}, range {}..{} dB",
            n,
            n / 2,
            settings.smoothing,
            settings.min_db,
            settings.max_db
        );

        Self {
            samples: Arc::clone(&audio.samples),
            sample_rate: audio.sample_rate,
            settings,
            fft,
            window: blackman_window(n),
            buffer: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; n / 2],
            bytes: vec![0; n / 2],
        }
    }

    fn analyse(&mut self, end: usize) {
        let n = self.settings.fft_size;
        let end = end.min(self.samples.len());
        let start = end.saturating_sub(n);
        // Left-pad with silence before the first full block
        let pad = n - (end - start);

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { self.samples[start + i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let tau = self.settings.smoothing;
        let scale = 1.0 / n as f32;
        let db_range = self.settings.max_db - self.settings.min_db;

        for k in 0..n / 2 {
            let magnitude = self.buffer[k].norm() * scale;
            self.smoothed[k] = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            let db = 20.0 * self.smoothed[k].max(f32::MIN_POSITIVE).log10();
            let scaled = (255.0 / db_range * (db - self.settings.min_db)).floor();
            self.bytes[k] = scaled.clamp(0.0, 255.0) as u8;
        }
    }
}

impl SpectralFrameSource for ByteSpectrumAnalyser {
    fn bin_count(&self) -> usize {
        self.settings.fft_size / 2
    }

    fn frame_at(&mut self, position: f64) -> &[u8] {
        let end = (position.max(0.0) * self.sample_rate as f64) as usize;
        self.analyse(end);
        &self.bytes
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42f32, 0.5f32, 0.08f32);
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}
