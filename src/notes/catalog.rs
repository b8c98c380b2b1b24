use serde::{Deserialize, Serialize};

/// A note from the fixed diatonic catalog, with its equal-temperament
/// reference pitch (A4 = 440 Hz).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub name: &'static str,
    pub frequency_hz: f32,
}

const fn note(name: &'static str, frequency_hz: f32) -> Note {
    Note { name, frequency_hz }
}

/// Every note the trainer can display or detect, lowest first.
pub const CATALOG: &[Note] = &[
    note("G2", 98.00),
    note("A2", 110.00),
    note("B2", 123.47),
    note("C3", 130.81),
    note("D3", 146.83),
    note("E3", 164.81),
    note("F3", 174.61),
    note("G3", 196.00),
    note("A3", 220.00),
    note("B3", 246.94),
    note("C4", 261.63),
    note("D4", 293.66),
    note("E4", 329.63),
    note("F4", 349.23),
    note("G4", 392.00),
    note("A4", 440.00),
    note("B4", 493.88),
    note("C5", 523.25),
    note("D5", 587.33),
    note("E5", 659.25),
    note("F5", 698.46),
    note("G5", 783.99),
    note("A5", 880.00),
];

/// Look up a catalog note by name ("C4", "G2", ...).
pub fn lookup(name: &str) -> Option<&'static Note> {
    CATALOG.iter().find(|n| n.name == name)
}

/// How far (as a percentage of the reference pitch) a measured frequency may
/// stray from a note and still count as that note.
///
/// Low notes get a wider window because FFT bins are coarse relative to
/// their pitch; high notes get a narrower one because neighbouring notes sit
/// further apart in Hz but the same distance apart in ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Tolerance for notes below `low_below_hz` (percent)
    pub low_pct: f32,
    /// Tolerance for notes between the two edges (percent)
    pub mid_pct: f32,
    /// Tolerance for notes above `high_above_hz` (percent)
    pub high_pct: f32,
    pub low_below_hz: f32,
    pub high_above_hz: f32,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            low_pct: 3.0,
            mid_pct: 2.0,
            high_pct: 1.8,
            low_below_hz: 300.0,
            high_above_hz: 600.0,
        }
    }
}

impl ToleranceConfig {
    /// Tolerance window in Hz around a note's reference frequency.
    pub fn window_hz(&self, reference_hz: f32) -> f32 {
        let pct = if reference_hz < self.low_below_hz {
            self.low_pct
        } else if reference_hz > self.high_above_hz {
            self.high_pct
        } else {
            self.mid_pct
        };
        reference_hz * pct / 100.0
    }
}

/// Map a frequency to the closest catalog note whose tolerance window
/// contains it.
///
/// Returns None when no note is close enough. When two notes are exactly
/// equidistant the lower one wins.
pub fn match_frequency(hz: f32, tolerance: &ToleranceConfig) -> Option<&'static Note> {
    if !hz.is_finite() || hz <= 0.0 {
        return None;
    }

    let mut best: Option<(&'static Note, f32)> = None;
    for note in CATALOG {
        let difference = (hz - note.frequency_hz).abs();
        if difference >= tolerance.window_hz(note.frequency_hz) {
            continue;
        }
        match best {
            Some((_, smallest)) if difference >= smallest => {}
            _ => best = Some((note, difference)),
        }
    }

    best.map(|(note, _)| note)
}
