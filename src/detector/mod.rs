//! Turns a stream of spectra into discrete "note played" events.
//!
//! Each call to [`NoteDetector::process`] is one detection cycle:
//!
//! 1. pick the loudest peaks in the musical band
//! 2. map each peak to a catalog note within tolerance
//! 3. advance per-note streak counters; notes missing from this frame lose
//!    their streak entirely
//! 4. report the loudest note whose streak reached the confirmation count,
//!    unless another report went out less than `min_interval` ago
//!
//! At most one note is reported per cycle.

pub mod listener;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::dsp::peaks::{self, PeakConfig};
use crate::dsp::spectrum::SpectralFrame;
use crate::notes::catalog::{self, Note, ToleranceConfig};

pub use listener::NoteListener;

/// Tunables for the detection cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    #[serde(flatten)]
    pub peaks: PeakConfig,
    /// Consecutive frames a note must be seen before it is reported
    pub required_detections: u32,
    /// Minimum time between two reports, whatever the note (ms)
    pub min_interval_ms: u64,
    pub tolerance: ToleranceConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            peaks: PeakConfig::default(),
            required_detections: 2,
            min_interval_ms: 200,
            tolerance: ToleranceConfig::default(),
        }
    }
}

impl DetectorConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

pub struct NoteDetector {
    config: DetectorConfig,
    /// Consecutive-frame count per note. Absent means "not currently seen".
    streaks: HashMap<&'static str, u32>,
    last_emitted: Option<Instant>,
}

impl NoteDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            streaks: HashMap::new(),
            last_emitted: None,
        }
    }

    /// Current streak for a note (0 when absent).
    pub fn streak(&self, name: &str) -> u32 {
        self.streaks.get(name).copied().unwrap_or(0)
    }

    /// Run one detection cycle on `frame`, observed at `now`.
    pub fn process(&mut self, frame: &SpectralFrame, now: Instant) -> Option<&'static Note> {
        let present = self.notes_in(frame);

        self.streaks.retain(|name, _| present.iter().any(|n| n.name == *name));
        for note in &present {
            *self.streaks.entry(note.name).or_insert(0) += 1;
        }

        let required = self.config.required_detections;
        let confirmed = present
            .iter()
            .copied()
            .find(|note| self.streak(note.name) >= required)?;

        if let Some(last) = self.last_emitted {
            let since = now.saturating_duration_since(last);
            if since < self.config.min_interval() {
                trace!("{} confirmed but rate limited ({since:?} since last)", confirmed.name);
                return None;
            }
        }

        debug!(
            "note detected: {} (streak {})",
            confirmed.name,
            self.streak(confirmed.name)
        );
        self.last_emitted = Some(now);
        Some(confirmed)
    }

    /// Forget all streaks and the rate-limit clock.
    pub fn reset(&mut self) {
        self.streaks.clear();
        self.last_emitted = None;
    }

    /// Distinct catalog notes matched by this frame's peaks, loudest first.
    fn notes_in(&self, frame: &SpectralFrame) -> Vec<&'static Note> {
        let mut notes: Vec<&'static Note> = Vec::new();
        for peak in peaks::find_peaks(frame, &self.config.peaks) {
            match catalog::match_frequency(peak.frequency_hz, &self.config.tolerance) {
                Some(note) if !notes.iter().any(|n| n.name == note.name) => notes.push(note),
                Some(_) => {}
                None => trace!("peak at {:.1} Hz matches no note", peak.frequency_hz),
            }
        }
        notes
    }
}

#[cfg(test)]
pub(crate) mod test_frames {
    use crate::dsp::spectrum::SpectralFrame;

    /// A 44.1 kHz / 8192-point frame with a clean peak at each frequency.
    pub fn frame_with(peaks: &[(f32, u8)]) -> SpectralFrame {
        let mut frame = SpectralFrame::silent(44100, 8192);
        for &(hz, amp) in peaks {
            // Centre on whichever bin lies closest to hz
            let width = frame.bin_width_hz();
            let bin = (hz / width).round() as usize;
            frame.bins[bin] = amp;
            frame.bins[bin - 1] = amp / 3;
            frame.bins[bin + 1] = amp / 3;
        }
        frame
    }

    pub fn note_frame(hz: f32) -> SpectralFrame {
        frame_with(&[(hz, 200)])
    }

    pub fn silence() -> SpectralFrame {
        SpectralFrame::silent(44100, 8192)
    }
}
