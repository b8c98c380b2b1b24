use serde::{Deserialize, Serialize};

use super::spectrum::SpectralFrame;

/// A local maximum in a spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub frequency_hz: f32,
    pub amplitude: u8,
}

/// Band and thresholds used when scanning a frame for peaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Lowest frequency scanned (Hz)
    pub min_hz: f32,
    /// Highest frequency scanned (Hz)
    pub max_hz: f32,
    /// How many of the loudest peaks to keep per frame
    pub top_k: usize,
    /// Amplitude threshold below `low_edge_hz`
    pub threshold_low: u8,
    /// Amplitude threshold between the edges
    pub threshold_mid: u8,
    /// Amplitude threshold above `high_edge_hz`
    pub threshold_high: u8,
    pub low_edge_hz: f32,
    pub high_edge_hz: f32,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            min_hz: 80.0,
            max_hz: 1200.0,
            top_k: 3,
            // Microphones roll off at both ends of the band, so the edges
            // need less level to count.
            threshold_low: 60,
            threshold_mid: 70,
            threshold_high: 65,
            low_edge_hz: 300.0,
            high_edge_hz: 700.0,
        }
    }
}

impl PeakConfig {
    pub fn threshold_at(&self, hz: f32) -> u8 {
        if hz < self.low_edge_hz {
            self.threshold_low
        } else if hz > self.high_edge_hz {
            self.threshold_high
        } else {
            self.threshold_mid
        }
    }
}

/// Find the loudest local maxima inside the configured band.
///
/// A bin is a peak when it is strictly louder than each neighbour that
/// exists and strictly above the threshold for its frequency. The result is
/// ordered loudest first (ties keep ascending frequency order) and holds at
/// most `top_k` entries.
pub fn find_peaks(frame: &SpectralFrame, config: &PeakConfig) -> Vec<SpectralPeak> {
    let bins = &frame.bins;
    if bins.is_empty() || config.top_k == 0 {
        return Vec::new();
    }

    let first = frame.bin_of(config.min_hz);
    let last = frame.bin_of(config.max_hz).min(bins.len());

    let mut peaks = Vec::new();
    for i in first..last {
        let amplitude = bins[i];
        let hz = frame.frequency_of(i);

        if amplitude <= config.threshold_at(hz) {
            continue;
        }
        let above_left = i == 0 || amplitude > bins[i - 1];
        let above_right = i + 1 == bins.len() || amplitude > bins[i + 1];

        if above_left && above_right {
            peaks.push(SpectralPeak {
                frequency_hz: hz,
                amplitude,
            });
        }
    }

    peaks.sort_by(|a, b| b.amplitude.cmp(&a.amplitude));
    peaks.truncate(config.top_k);
    peaks
}
