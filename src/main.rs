mod audio;
mod cli;
mod config;
mod detector;
mod dsp;
mod notes;
mod paths;
mod practice;
mod stats;
mod storage;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use rand::rngs::StdRng;
use rand::SeedableRng;

use audio::capture::MicInput;
use cli::{Cli, Command};
use config::AppConfig;
use detector::NoteListener;
use notes::{catalog, PracticeMode};
use practice::PracticeSession;
use stats::{summary, PracticeStats, ProgressSummary};
use storage::{SqliteStore, UserSettings};
use tui::screens::practice::ScreenOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Anything logged during practice would land on the TUI, so stay quiet
    // there unless RUST_LOG asks otherwise.
    let default_level = match cli.command {
        Command::Practice { .. } => "off",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = config::load_config()?;

    match cli.command {
        Command::Practice {
            mode,
            adaptive,
            no_adaptive,
        } => run_practice(&config, mode, adaptive, no_adaptive),

        Command::Stats { mode, reset } => show_stats(mode, reset),

        Command::Export { output } => {
            let stats = PracticeStats::load(Box::new(SqliteStore::open_default()?));
            let json = summary::export_json(&stats)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported practice history to {}", path.display());
                }
                None => println!("{json}"),
            }
            Ok(())
        }

        Command::Settings {
            volume,
            large_notes,
            mode,
            adaptive,
        } => update_settings(volume, large_notes, mode, adaptive),

        Command::Play { note } => {
            let note = catalog::lookup(&note.to_uppercase())
                .with_context(|| format!("Unknown note '{note}' (expected G2 to A5, e.g. A4)"))?;
            let settings = UserSettings::load(&SqliteStore::open_default()?);
            println!("Playing {} ({:.2} Hz)", note.name, note.frequency_hz);
            audio::playback::play_note(note, settings.volume)
        }

        Command::Devices => audio::devices::list_devices(&config.audio.device),

        Command::MicCheck => audio::mic_check::run(&config),

        Command::Paths => {
            println!("Config: {}", paths::config_file().display());
            println!("Data:   {}", paths::db_path().display());
            Ok(())
        }
    }
}

fn run_practice(
    config: &AppConfig,
    mode: Option<PracticeMode>,
    adaptive: bool,
    no_adaptive: bool,
) -> Result<()> {
    let settings = UserSettings::load(&SqliteStore::open_default()?);
    let mode = mode.unwrap_or(settings.practice_mode);
    let adaptive = cli::resolve_adaptive(adaptive, no_adaptive, settings.adaptive);

    let stats = PracticeStats::load(Box::new(SqliteStore::open_default()?));
    let mut session = PracticeSession::new(
        stats,
        mode,
        adaptive,
        &config.practice,
        StdRng::from_entropy(),
    );
    let input = MicInput::new(config.audio.device.clone(), config.audio.spectrum_config());
    let mut listener = NoteListener::new(input, config.detector.clone());
    let options = ScreenOptions {
        tick: config.practice.tick(),
        volume: settings.volume,
        large_notes: settings.large_notes,
    };

    let summary = tui::run_screen(|terminal| {
        tui::screens::practice::run(terminal, &mut session, &mut listener, &options)
    })?;

    println!("{}", style("Session finished").bold());
    println!("{}", summary.render());
    Ok(())
}

fn show_stats(mode: Option<PracticeMode>, reset: bool) -> Result<()> {
    let mut stats = PracticeStats::load(Box::new(SqliteStore::open_default()?));

    if reset {
        stats.clear()?;
        println!("Practice history cleared.");
        return Ok(());
    }

    if stats.is_empty() {
        println!("No practice history yet. Run `note-trainer practice` to start.");
        return Ok(());
    }

    // Without --mode, show whichever full range has been practised
    let (modes, skip_empty) = match mode {
        Some(mode) => (vec![mode], false),
        None => (vec![PracticeMode::TrebleAll, PracticeMode::BassAll], true),
    };
    for mode in modes {
        let report = ProgressSummary::build(mode.notes(), &stats, 0);
        if skip_empty && report.attempts == 0 {
            continue;
        }
        println!("{}", style(format!("── {} ──", mode.name())).cyan().bold());
        for line in report.lines().iter().skip(1) {
            println!("{line}");
        }
        println!();
    }
    Ok(())
}

fn update_settings(
    volume: Option<u8>,
    large_notes: Option<bool>,
    mode: Option<PracticeMode>,
    adaptive: Option<bool>,
) -> Result<()> {
    let mut store = SqliteStore::open_default()?;
    let mut settings = UserSettings::load(&store);

    let changed = volume.is_some() || large_notes.is_some() || mode.is_some() || adaptive.is_some();
    if let Some(volume) = volume {
        settings.volume = volume;
    }
    if let Some(large_notes) = large_notes {
        settings.large_notes = large_notes;
    }
    if let Some(mode) = mode {
        settings.practice_mode = mode;
    }
    if let Some(adaptive) = adaptive {
        settings.adaptive = adaptive;
    }
    if changed {
        settings.save(&mut store)?;
        println!("{}", style("Settings saved.").green());
    }

    println!("  volume:       {}", settings.volume);
    println!("  large notes:  {}", settings.large_notes);
    println!("  mode:         {}", settings.practice_mode.name());
    println!("  adaptive:     {}", settings.adaptive);
    Ok(())
}
