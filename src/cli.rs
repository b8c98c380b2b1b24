use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::notes::PracticeMode;

#[derive(Parser)]
#[command(name = "note-trainer")]
#[command(about = "Learn to read notes by playing them into the microphone")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start an interactive practice session
    Practice {
        /// Which notes to practise (defaults to the saved setting)
        #[arg(long, value_enum)]
        mode: Option<PracticeMode>,

        /// Favour notes you get wrong
        #[arg(long, conflicts_with = "no_adaptive")]
        adaptive: bool,

        /// Pick notes uniformly at random
        #[arg(long)]
        no_adaptive: bool,
    },

    /// Show accuracy per note and the notes that need work
    Stats {
        /// Limit the report to one practice range
        #[arg(long, value_enum)]
        mode: Option<PracticeMode>,

        /// Forget all practice history
        #[arg(long)]
        reset: bool,
    },

    /// Export practice history as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show or change saved preferences
    Settings {
        /// Reference tone volume (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,

        /// Show the hint in large block letters
        #[arg(long, action = ArgAction::Set)]
        large_notes: Option<bool>,

        /// Default practice range
        #[arg(long, value_enum)]
        mode: Option<PracticeMode>,

        /// Use adaptive note selection by default
        #[arg(long, action = ArgAction::Set)]
        adaptive: Option<bool>,
    },

    /// Play the reference tone for a note (e.g. A4)
    Play {
        note: String,
    },

    /// List available audio input devices
    Devices,

    /// Listen for a few seconds and report what the detector hears
    MicCheck,

    /// Show where data and config files are stored
    Paths,
}

/// Resolve the --adaptive / --no-adaptive pair against the saved default.
pub fn resolve_adaptive(adaptive: bool, no_adaptive: bool, default: bool) -> bool {
    match (adaptive, no_adaptive) {
        (true, _) => true,
        (_, true) => false,
        _ => default,
    }
}
