use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// A byte-scaled magnitude spectrum for one analysis window.
///
/// `bins[i]` holds the smoothed level of the band centred on
/// `i * sample_rate / fft_size` Hz, mapped from `[min_db, max_db]` onto
/// `0..=255`. Frames are transient: produced once per hop, consumed by a
/// single detection cycle, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    pub bins: Vec<u8>,
    pub sample_rate: u32,
    pub fft_size: usize,
}

impl SpectralFrame {
    /// A silent frame (all bins zero).
    pub fn silent(sample_rate: u32, fft_size: usize) -> Self {
        Self {
            bins: vec![0; fft_size / 2],
            sample_rate,
            fft_size,
        }
    }

    /// Width of one bin in Hz.
    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate as f32 / self.fft_size as f32
    }

    /// Centre frequency of a bin.
    pub fn frequency_of(&self, bin: usize) -> f32 {
        bin as f32 * self.bin_width_hz()
    }

    /// Bin whose range contains `hz` (rounded down).
    pub fn bin_of(&self, hz: f32) -> usize {
        (hz.max(0.0) / self.bin_width_hz()).floor() as usize
    }
}

/// Parameters for turning raw samples into a `SpectralFrame`.
#[derive(Debug, Clone)]
pub struct SpectrumConfig {
    /// FFT length in samples (power of two).
    pub fft_size: usize,
    /// Samples between successive frames.
    pub hop_size: usize,
    /// Weight of the previous frame in exponential smoothing (0.0 = none).
    pub smoothing: f32,
    /// Level mapped to byte 0.
    pub min_db: f32,
    /// Level mapped to byte 255.
    pub max_db: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: 8192,
            hop_size: 2048,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -10.0,
        }
    }
}

/// Stateful short-time spectrum analyser.
///
/// Keeps the previous magnitudes so levels decay smoothly between frames,
/// which steadies peaks from a ringing string or a wavering voice.
pub struct SpectrumAnalyzer {
    config: SpectrumConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(config: SpectrumConfig) -> Self {
        let n = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(n);
        Self {
            window: hann_window(n),
            smoothed: vec![0.0; n / 2],
            scratch: vec![Complex { re: 0.0, im: 0.0 }; n],
            fft,
            config,
        }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Analyse the most recent `fft_size` samples.
    ///
    /// Shorter input is zero-padded at the front, longer input uses only its
    /// tail.
    pub fn analyze(&mut self, samples: &[f32], sample_rate: u32) -> SpectralFrame {
        let n = self.config.fft_size;
        let tail = &samples[samples.len().saturating_sub(n)..];
        let pad = n - tail.len();

        let mean = if tail.is_empty() {
            0.0
        } else {
            tail.iter().sum::<f32>() / tail.len() as f32
        };

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { tail[i - pad] - mean };
            *slot = Complex {
                re: sample * self.window[i],
                im: 0.0,
            };
        }

        self.fft.process(&mut self.scratch);

        let tau = self.config.smoothing.clamp(0.0, 0.999);
        let range_db = (self.config.max_db - self.config.min_db).max(f32::EPSILON);
        let mut bins = Vec::with_capacity(n / 2);

        for (k, level) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() / n as f32;
            *level = tau * *level + (1.0 - tau) * magnitude;

            let db = if *level > 0.0 {
                20.0 * level.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (db - self.config.min_db) / range_db;
            bins.push(scaled.clamp(0.0, 255.0) as u8);
        }

        SpectralFrame {
            bins,
            sample_rate,
            fft_size: n,
        }
    }
}

/// Hann window coefficients: w(n) = 0.5 * (1 - cos(2πn / (N - 1))).
fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let scale = 2.0 * PI / (n - 1) as f32;
    (0..n).map(|i| 0.5 * (1.0 - (scale * i as f32).cos())).collect()
}
