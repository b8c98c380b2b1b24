pub mod capture;
pub mod devices;
pub mod mic_check;
pub mod playback;

use thiserror::Error;

use crate::dsp::spectrum::SpectralFrame;

/// Why the microphone could not be opened.
///
/// Every variant means the same thing to the user: detection is off and
/// notes must be advanced by hand.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio input device found")]
    NoDevice,
    #[error("input device not found: {0}")]
    DeviceNotFound(String),
    #[error("could not query input config: {0}")]
    Config(String),
    #[error("could not open input stream: {0}")]
    BuildStream(String),
    #[error("could not start input stream: {0}")]
    Play(String),
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// A source of live spectra.
///
/// `start` acquires the underlying device and `stop` releases it; both must
/// be safe to call in any order. `latest_frame` hands out the newest frame
/// produced since the previous call, or None if nothing new arrived.
pub trait AudioInput {
    fn start(&mut self) -> Result<(), CaptureError>;
    fn stop(&mut self);
    fn latest_frame(&mut self) -> Option<SpectralFrame>;
    /// Sample rate of the running capture, if any.
    fn sample_rate(&self) -> Option<u32>;
}
