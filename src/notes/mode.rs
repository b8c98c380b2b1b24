use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clef {
    Treble,
    Bass,
}

impl Clef {
    pub fn label(self) -> &'static str {
        match self {
            Clef::Treble => "Treble clef",
            Clef::Bass => "Bass clef",
        }
    }

    /// Steps above the bottom staff line for a note name like "C4".
    ///
    /// Even positions sit on a line, odd ones in a space; the staff spans
    /// 0..=8 and anything outside needs ledger lines.
    pub fn staff_position(self, name: &str) -> Option<i32> {
        let bottom_line = match self {
            Clef::Treble => diatonic_index("E4")?,
            Clef::Bass => diatonic_index("G2")?,
        };
        Some(diatonic_index(name)? - bottom_line)
    }
}

/// Diatonic step count from C0.
fn diatonic_index(name: &str) -> Option<i32> {
    let mut chars = name.chars();
    let step = match chars.next()? {
        'C' => 0,
        'D' => 1,
        'E' => 2,
        'F' => 3,
        'G' => 4,
        'A' => 5,
        'B' => 6,
        _ => return None,
    };
    let octave: i32 = chars.as_str().parse().ok()?;
    Some(octave * 7 + step)
}

/// Which subset of the catalog a session practises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PracticeMode {
    /// Every treble clef note, C4 to A5
    #[default]
    TrebleAll,
    /// Notes on the treble staff lines (E G B D F)
    TrebleStaff,
    /// Notes in the treble staff spaces (F A C E)
    TrebleSpaces,
    /// Treble ledger-line notes
    TrebleLedger,
    /// Every bass clef note, G2 to E4
    BassAll,
    /// Notes on the bass staff lines (G B D F A)
    BassStaff,
    /// Notes in the bass staff spaces (A C E G)
    BassSpaces,
}

impl PracticeMode {
    /// The practice range for this mode, lowest note first.
    pub fn notes(self) -> &'static [&'static str] {
        match self {
            PracticeMode::TrebleAll => &[
                "C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5", "D5", "E5", "F5", "G5", "A5",
            ],
            PracticeMode::TrebleStaff => &["E4", "G4", "B4", "D5", "F5"],
            PracticeMode::TrebleSpaces => &["F4", "A4", "C5", "E5"],
            PracticeMode::TrebleLedger => &["C4", "D4", "A5"],
            PracticeMode::BassAll => &[
                "G2", "A2", "B2", "C3", "D3", "E3", "F3", "G3", "A3", "B3", "C4", "D4", "E4",
            ],
            PracticeMode::BassStaff => &["G2", "B2", "D3", "F3", "A3"],
            PracticeMode::BassSpaces => &["A2", "C3", "E3", "G3"],
        }
    }

    pub fn clef(self) -> Clef {
        match self {
            PracticeMode::BassAll | PracticeMode::BassStaff | PracticeMode::BassSpaces => Clef::Bass,
            _ => Clef::Treble,
        }
    }

    /// Name as accepted on the command line.
    pub fn name(self) -> String {
        self.to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default()
    }
}
