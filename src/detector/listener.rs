use std::time::Instant;

use log::{info, warn};

use crate::audio::{AudioInput, CaptureError};
use crate::notes::Note;

use super::{DetectorConfig, NoteDetector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Listening,
}

/// Couples an audio input with a `NoteDetector`.
///
/// The owner drives it by calling [`tick`](NoteListener::tick) from its own
/// loop (a UI redraw, a timer); the listener never schedules itself. While
/// idle, ticks do nothing and report nothing.
pub struct NoteListener<A: AudioInput> {
    input: A,
    detector: NoteDetector,
    state: ListenerState,
}

impl<A: AudioInput> NoteListener<A> {
    pub fn new(input: A, config: DetectorConfig) -> Self {
        Self {
            input,
            detector: NoteDetector::new(config),
            state: ListenerState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListenerState::Listening
    }

    /// Acquire the audio input and begin detecting.
    ///
    /// On failure the listener stays idle and the error is returned for the
    /// caller to show; calling again retries.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_listening() {
            return Ok(());
        }
        if let Err(e) = self.input.start() {
            warn!("audio capture unavailable: {e}");
            return Err(e);
        }
        self.detector.reset();
        self.state = ListenerState::Listening;
        info!("listening for notes");
        Ok(())
    }

    /// Release the audio input. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.state == ListenerState::Listening {
            self.input.stop();
            info!("stopped listening");
        }
        self.detector.reset();
        self.state = ListenerState::Idle;
    }

    /// Process the newest available spectrum, if any.
    ///
    /// Returns at most one confirmed note. Never blocks.
    pub fn tick(&mut self, now: Instant) -> Option<&'static Note> {
        if !self.is_listening() {
            return None;
        }
        let frame = self.input.latest_frame()?;
        self.detector.process(&frame, now)
    }
}

impl<A: AudioInput> Drop for NoteListener<A> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::detector::test_frames::{note_frame, silence};
    use crate::dsp::spectrum::SpectralFrame;

    #[derive(Default)]
    struct Calls {
        starts: usize,
        stops: usize,
    }

    /// Scripted input: hands out queued frames, can be told to fail start.
    struct FakeInput {
        frames: VecDeque<SpectralFrame>,
        fail_start: bool,
        running: bool,
        calls: Rc<RefCell<Calls>>,
    }

    impl FakeInput {
        fn new(frames: Vec<SpectralFrame>) -> (Self, Rc<RefCell<Calls>>) {
            let calls = Rc::new(RefCell::new(Calls::default()));
            let input = Self {
                frames: frames.into(),
                fail_start: false,
                running: false,
                calls: Rc::clone(&calls),
            };
            (input, calls)
        }
    }

    impl AudioInput for FakeInput {
        fn start(&mut self) -> Result<(), CaptureError> {
            self.calls.borrow_mut().starts += 1;
            if self.fail_start {
                return Err(CaptureError::NoDevice);
            }
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.calls.borrow_mut().stops += 1;
            self.running = false;
        }

        fn latest_frame(&mut self) -> Option<SpectralFrame> {
            if self.running {
                self.frames.pop_front()
            } else {
                None
            }
        }

        fn sample_rate(&self) -> Option<u32> {
            self.running.then_some(44100)
        }
    }

    fn ticks<A: AudioInput>(listener: &mut NoteListener<A>, n: usize) -> Vec<&'static str> {
        let t0 = Instant::now();
        (0..n)
            .filter_map(|i| listener.tick(t0 + Duration::from_millis(i as u64 * 16)))
            .map(|note| note.name)
            .collect()
    }

    #[test]
    fn idle_listener_emits_nothing() {
        let (input, calls) = FakeInput::new(vec![note_frame(440.0); 4]);
        let mut listener = NoteListener::new(input, DetectorConfig::default());
        assert_eq!(listener.state(), ListenerState::Idle);
        assert!(ticks(&mut listener, 4).is_empty());
        assert_eq!(calls.borrow().starts, 0);
    }

    #[test]
    fn listening_detects_notes() {
        let (input, _) = FakeInput::new(vec![note_frame(440.0); 2]);
        let mut listener = NoteListener::new(input, DetectorConfig::default());
        listener.start().unwrap();
        assert_eq!(ticks(&mut listener, 3), vec!["A4"]);
    }

    #[test]
    fn ticks_without_new_frames_do_nothing() {
        let (input, _) = FakeInput::new(vec![note_frame(440.0), silence()]);
        let mut listener = NoteListener::new(input, DetectorConfig::default());
        listener.start().unwrap();
        assert!(ticks(&mut listener, 10).is_empty());
    }

    #[test]
    fn failed_start_stays_idle() {
        let (mut input, calls) = FakeInput::new(vec![note_frame(440.0); 4]);
        input.fail_start = true;
        let mut listener = NoteListener::new(input, DetectorConfig::default());
        let err = listener.start().unwrap_err();
        assert!(matches!(err, CaptureError::NoDevice));
        assert_eq!(listener.state(), ListenerState::Idle);
        assert!(ticks(&mut listener, 4).is_empty());
        drop(listener);
        // Nothing was acquired, so nothing is released
        assert_eq!(calls.borrow().stops, 0);
    }

    #[test]
    fn start_is_idempotent() {
        let (input, calls) = FakeInput::new(vec![]);
        let mut listener = NoteListener::new(input, DetectorConfig::default());
        listener.start().unwrap();
        listener.start().unwrap();
        assert_eq!(calls.borrow().starts, 1);
    }

    #[test]
    fn stop_is_idempotent_and_releases_once() {
        let (input, calls) = FakeInput::new(vec![note_frame(440.0); 4]);
        let mut listener = NoteListener::new(input, DetectorConfig::default());
        listener.start().unwrap();
        listener.stop();
        listener.stop();
        assert_eq!(listener.state(), ListenerState::Idle);
        assert!(ticks(&mut listener, 4).is_empty());
        drop(listener);
        assert_eq!(calls.borrow().stops, 1);
    }

    #[test]
    fn drop_releases_input() {
        let (input, calls) = FakeInput::new(vec![]);
        let mut listener = NoteListener::new(input, DetectorConfig::default());
        listener.start().unwrap();
        drop(listener);
        assert_eq!(calls.borrow().stops, 1);
    }

    #[test]
    fn restart_begins_with_fresh_streaks() {
        let (input, _) = FakeInput::new(vec![note_frame(440.0), note_frame(440.0)]);
        let mut listener = NoteListener::new(input, DetectorConfig::default());
        listener.start().unwrap();
        let t0 = Instant::now();
        assert!(listener.tick(t0).is_none());
        listener.stop();
        listener.start().unwrap();
        // Second A4 frame arrives after the restart: only one frame of streak
        assert!(listener.tick(t0 + Duration::from_millis(16)).is_none());
    }
}
