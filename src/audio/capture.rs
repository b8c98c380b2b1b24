use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use log::{debug, error, info};

use crate::dsp::spectrum::{SpectralFrame, SpectrumAnalyzer, SpectrumConfig};

use super::{AudioInput, CaptureError};

/// Single-slot handoff between the analysis thread and the detector.
///
/// Holds only the newest frame: a slow consumer sees stale data, never a
/// backlog.
#[derive(Default)]
pub struct LatestFrame {
    slot: Mutex<Option<SpectralFrame>>,
}

impl LatestFrame {
    pub fn publish(&self, frame: SpectralFrame) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(frame);
        }
    }

    pub fn take(&self) -> Option<SpectralFrame> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Microphone input via cpal.
///
/// Each `start` opens the device, spawns an analysis thread fed by the
/// stream callback, and publishes one spectrum per hop. `stop` (or drop)
/// tears all of that down again.
pub struct MicInput {
    device_name: String,
    spectrum: SpectrumConfig,
    active: Option<ActiveCapture>,
}

struct ActiveCapture {
    stream: Option<cpal::Stream>,
    stop: Arc<AtomicBool>,
    latest: Arc<LatestFrame>,
    worker: Option<JoinHandle<()>>,
    sample_rate: u32,
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // Dropping the stream drops the callback's sender, which ends the
        // worker's receive loop.
        drop(self.stream.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("spectrum worker panicked");
            }
        }
    }
}

impl MicInput {
    /// `device_name` is an input device name, or "default".
    pub fn new(device_name: impl Into<String>, spectrum: SpectrumConfig) -> Self {
        Self {
            device_name: device_name.into(),
            spectrum,
            active: None,
        }
    }

    fn open(&self) -> Result<ActiveCapture, CaptureError> {
        let host = cpal::default_host();
        let device = select_device(&host, &self.device_name)?;

        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::Config(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let format = config.sample_format();
        info!(
            "opening {} ({channels}ch, {sample_rate} Hz, {format:?})",
            device.name().unwrap_or_else(|_| "<unknown>".into())
        );

        let (tx, rx) = mpsc::channel::<Vec<f32>>();
        let stop = Arc::new(AtomicBool::new(false));
        let latest = Arc::new(LatestFrame::default());

        let stream = match format {
            SampleFormat::F32 => {
                let stop_stream = Arc::clone(&stop);
                device.build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if stop_stream.load(Ordering::Relaxed) {
                            return;
                        }
                        let mono: Vec<f32> = data.iter().step_by(channels).copied().collect();
                        let _ = tx.send(mono);
                    },
                    |err| error!("input stream error: {err}"),
                    None,
                )
            }
            SampleFormat::I16 => {
                let stop_stream = Arc::clone(&stop);
                device.build_input_stream(
                    &config.into(),
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        if stop_stream.load(Ordering::Relaxed) {
                            return;
                        }
                        let mono: Vec<f32> = data
                            .iter()
                            .step_by(channels)
                            .map(|&s| s as f32 / i16::MAX as f32)
                            .collect();
                        let _ = tx.send(mono);
                    },
                    |err| error!("input stream error: {err}"),
                    None,
                )
            }
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        }
        .map_err(|e| CaptureError::BuildStream(e.to_string()))?;

        let worker = spawn_analysis(
            rx,
            SpectrumAnalyzer::new(self.spectrum.clone()),
            sample_rate,
            Arc::clone(&stop),
            Arc::clone(&latest),
        );

        // From here on the device is held; ActiveCapture's Drop releases it
        // on every exit path.
        let capture = ActiveCapture {
            stream: Some(stream),
            stop,
            latest,
            worker: Some(worker),
            sample_rate,
        };

        if let Some(stream) = capture.stream.as_ref() {
            stream.play().map_err(|e| CaptureError::Play(e.to_string()))?;
        }

        Ok(capture)
    }
}

impl AudioInput for MicInput {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.is_none() {
            self.active = Some(self.open()?);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.active.take().is_some() {
            debug!("audio capture released");
        }
    }

    fn latest_frame(&mut self) -> Option<SpectralFrame> {
        self.active.as_ref().and_then(|a| a.latest.take())
    }

    fn sample_rate(&self) -> Option<u32> {
        self.active.as_ref().map(|a| a.sample_rate)
    }
}

fn select_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, CaptureError> {
    if name.is_empty() || name == "default" {
        return host.default_input_device().ok_or(CaptureError::NoDevice);
    }

    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::Config(e.to_string()))?;
    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(CaptureError::DeviceNotFound(name.to_string()))
}

/// Accumulate mono chunks and publish a spectrum every `hop_size` samples.
fn spawn_analysis(
    rx: mpsc::Receiver<Vec<f32>>,
    mut analyzer: SpectrumAnalyzer,
    sample_rate: u32,
    stop: Arc<AtomicBool>,
    latest: Arc<LatestFrame>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let fft_size = analyzer.config().fft_size;
        let hop = analyzer.config().hop_size.max(1);
        let mut window = SampleWindow::new(fft_size, hop);

        for chunk in rx.iter() {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            if window.push(&chunk) {
                latest.publish(analyzer.analyze(window.samples(), sample_rate));
            }
        }
    })
}

/// Sliding window over the most recent `size` samples that tracks when the
/// next hop is due.
struct SampleWindow {
    buffer: Vec<f32>,
    size: usize,
    hop: usize,
    pending: usize,
}

impl SampleWindow {
    fn new(size: usize, hop: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(size * 2),
            size,
            hop,
            pending: 0,
        }
    }

    /// Append samples; true when at least one hop boundary was crossed.
    /// Several boundaries in one chunk still yield a single analysis since
    /// only the newest window is kept.
    fn push(&mut self, chunk: &[f32]) -> bool {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > self.size {
            let excess = self.buffer.len() - self.size;
            self.buffer.drain(..excess);
        }
        self.pending += chunk.len();
        let crossed = self.pending >= self.hop;
        self.pending %= self.hop;
        crossed
    }

    fn samples(&self) -> &[f32] {
        &self.buffer
    }
}
