use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyEvent, KeyEventKind};

/// Input for the practice loop.
pub enum AppEvent {
    /// A key press. Releases and repeats are filtered out.
    Key(KeyEvent),
    Resize(u16, u16),
    /// No input arrived within one tick; time to poll the detector.
    Tick,
}

/// Background thread turning crossterm input into [`AppEvent`]s.
///
/// A `Tick` is sent whenever `tick_rate` passes without input, so the
/// receiver sees at least one event per tick.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    _handle: JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        let handle = std::thread::spawn(move || loop {
            let event = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                    Ok(Event::Resize(w, h)) => AppEvent::Resize(w, h),
                    _ => continue,
                }
            } else {
                AppEvent::Tick
            };

            // Receiver gone: the screen has exited
            if tx.send(event).is_err() {
                return;
            }
        });

        Self {
            rx,
            _handle: handle,
        }
    }

    /// Block until the next event.
    pub fn next(&self) -> Result<AppEvent, mpsc::RecvError> {
        self.rx.recv()
    }
}
