use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;
use rodio::source::SineWave;
use rodio::{OutputStream, Sink, Source};

use crate::notes::Note;

/// Length of a reference tone.
pub const TONE_DURATION: Duration = Duration::from_millis(1000);

/// Gain for a 0-100 volume setting. Full volume is kept well below clipping
/// since a pure sine sounds much louder than its peak level suggests.
pub fn gain_for_volume(volume: u8) -> f32 {
    volume.min(100) as f32 / 100.0 * 0.3
}

/// Play a note's reference pitch and wait for it to finish.
pub fn play_note(note: &Note, volume: u8) -> Result<()> {
    // `_stream` is an RAII guard: dropping it silences the output.
    let (_stream, stream_handle) =
        OutputStream::try_default().context("Failed to open audio output device")?;
    let sink = Sink::try_new(&stream_handle).context("Failed to create audio sink")?;

    let tone = SineWave::new(note.frequency_hz)
        .take_duration(TONE_DURATION)
        .fade_in(Duration::from_millis(10))
        .amplify(gain_for_volume(volume));

    sink.append(tone);
    sink.sleep_until_end();
    Ok(())
}

/// Play a note on a background thread so the caller's loop keeps running.
///
/// The output stream is opened inside the thread because rodio streams
/// cannot cross threads.
pub fn play_note_detached(note: &'static Note, volume: u8) {
    std::thread::spawn(move || {
        if let Err(e) = play_note(note, volume) {
            warn!("could not play {}: {e:#}", note.name);
        }
    });
}
