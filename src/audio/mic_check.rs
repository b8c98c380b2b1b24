use std::time::{Duration, Instant};

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::AppConfig;
use crate::detector::NoteDetector;
use crate::dsp::peaks;

use super::capture::MicInput;
use super::AudioInput;

const CAPTURE_SECONDS: u64 = 3;

/// What a short listening pass heard.
#[derive(Debug, Default)]
pub struct MicReport {
    pub frames: usize,
    /// Loudest in-band peak level seen (0-255)
    pub loudest: u8,
    pub loudest_hz: Option<f32>,
    /// Notes the detector confirmed, in order
    pub notes: Vec<&'static str>,
}

impl MicReport {
    fn observe(&mut self, loudest: Option<peaks::SpectralPeak>, note: Option<&'static str>) {
        self.frames += 1;
        if let Some(peak) = loudest {
            if peak.amplitude > self.loudest {
                self.loudest = peak.amplitude;
                self.loudest_hz = Some(peak.frequency_hz);
            }
        }
        if let Some(name) = note {
            self.notes.push(name);
        }
    }

    fn verdict(&self) -> Verdict {
        if self.frames == 0 {
            Verdict::NoAudio
        } else if self.loudest_hz.is_none() {
            Verdict::TooQuiet
        } else if self.notes.is_empty() {
            Verdict::NoNotes
        } else {
            Verdict::Ok
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    NoAudio,
    TooQuiet,
    NoNotes,
    Ok,
}

/// Listen for a few seconds and report whether notes can be detected.
pub fn run(config: &AppConfig) -> Result<()> {
    let mut mic = MicInput::new(config.audio.device.clone(), config.audio.spectrum_config());
    let mut detector = NoteDetector::new(config.detector.clone());

    println!(
        "  Play a few notes. Listening for {} seconds...",
        style(CAPTURE_SECONDS).cyan().bold()
    );
    println!();

    mic.start()?;
    if let Some(rate) = mic.sample_rate() {
        println!("  Sample rate: {rate} Hz");
    }

    let pb = ProgressBar::new(CAPTURE_SECONDS * 10);
    pb.set_style(
        ProgressStyle::with_template("  Listening {bar:30.green/dim} {elapsed_precise}  {msg}")?,
    );

    let start = Instant::now();
    let mut report = MicReport::default();

    while start.elapsed() < Duration::from_secs(CAPTURE_SECONDS) {
        if let Some(frame) = mic.latest_frame() {
            let loudest = peaks::find_peaks(&frame, &config.detector.peaks).first().copied();
            let note = detector.process(&frame, Instant::now()).map(|n| n.name);
            if let Some(name) = note {
                pb.set_message(name);
            }
            report.observe(loudest, note);
        }
        std::thread::sleep(Duration::from_millis(16));
        pb.set_position((start.elapsed().as_millis() / 100) as u64);
    }

    mic.stop();
    pb.finish_and_clear();

    print_report(&report);
    Ok(())
}

fn print_report(report: &MicReport) {
    println!("  Frames analysed: {}", report.frames);
    match report.loudest_hz {
        Some(hz) => println!("  Loudest peak:    {} at {:.1} Hz", report.loudest, hz),
        None => println!("  Loudest peak:    none above threshold"),
    }
    if !report.notes.is_empty() {
        println!("  Notes heard:     {}", report.notes.join(" "));
    }
    println!();

    match report.verdict() {
        Verdict::NoAudio => {
            eprintln!(
                "  {} No audio arrived. Check your microphone connection.",
                style("WARNING").red().bold()
            );
            eprintln!("  Run `note-trainer devices` to check available inputs.");
        }
        Verdict::TooQuiet => println!(
            "  {} Nothing rose above the detection threshold. Play louder or move closer.",
            style("NOTE").yellow().bold()
        ),
        Verdict::NoNotes => println!(
            "  {} Sound detected but no catalog note was held long enough.",
            style("NOTE").yellow().bold()
        ),
        Verdict::Ok => println!("  {} Microphone is working.", style("OK").green().bold()),
    }
}
