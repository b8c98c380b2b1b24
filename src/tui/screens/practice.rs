use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::Rng;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::audio::playback;
use crate::audio::AudioInput;
use crate::detector::NoteListener;
use crate::notes::catalog;
use crate::practice::{Judgement, PracticeSession, VisualState};
use crate::stats::ProgressSummary;
use crate::tui::event::{AppEvent, EventHandler};
use crate::tui::widgets::note_display::NoteDisplayWidget;
use crate::tui::widgets::stats_panel::StatsPanelWidget;
use crate::tui::Tui;

/// Display options that come from config and user settings.
pub struct ScreenOptions {
    pub tick: Duration,
    pub volume: u8,
    pub large_notes: bool,
}

enum Action {
    None,
    Quit,
}

/// Run the practice screen until the user quits. Returns the final summary.
///
/// The microphone is started here. If it cannot be opened the error is
/// shown in the status line and the session carries on with manual answers.
pub fn run<R: Rng, A: AudioInput>(
    terminal: &mut Tui,
    session: &mut PracticeSession<R>,
    listener: &mut NoteListener<A>,
    options: &ScreenOptions,
) -> anyhow::Result<ProgressSummary> {
    let mic_error = match listener.start() {
        Ok(()) => None,
        Err(e) => {
            warn!("continuing without microphone: {e}");
            Some(e.to_string())
        }
    };
    session.start();

    let events = EventHandler::new(options.tick);
    let mut show_stats = false;

    loop {
        let now = Instant::now();
        if let Some(note) = listener.tick(now) {
            debug!("detected {} ({:.2} Hz)", note.name, note.frequency_hz);
            let judgement = session.on_note_detected(note.name, now);
            react(session, judgement, options.volume);
        }
        session.tick(now);

        let summary = show_stats.then(|| session.summary());
        let status = status_line(session, mic_error.as_deref());
        terminal.draw(|frame| {
            let area = frame.area();
            render_practice(frame, area, session, &status, options.large_notes);
            if let Some(summary) = &summary {
                frame.render_widget(StatsPanelWidget::new(summary), centered(area, 54, 16));
            }
        })?;

        if let AppEvent::Key(key) = events.next()? {
            match handle_key(key, session, &mut show_stats, options.volume) {
                Action::Quit => break,
                Action::None => {}
            }
        }
    }

    listener.stop();
    Ok(session.summary())
}

fn handle_key<R: Rng>(
    key: KeyEvent,
    session: &mut PracticeSession<R>,
    show_stats: &mut bool,
    volume: u8,
) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc if *show_stats => *show_stats = false,
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
        KeyCode::Char(' ') => session.skip(),
        KeyCode::Char('p') => play_current(session, volume),
        KeyCode::Char('h') => session.toggle_hint(),
        KeyCode::Char('s') => *show_stats = !*show_stats,
        KeyCode::Char('t') => {
            let judgement = session.test_correct(Instant::now());
            react(session, judgement, volume);
        }
        _ => {}
    }
    Action::None
}

/// A correct answer is rewarded with the reference tone.
fn react<R: Rng>(session: &PracticeSession<R>, judgement: Judgement, volume: u8) {
    if judgement == Judgement::Correct {
        play_current(session, volume);
    }
}

fn play_current<R: Rng>(session: &PracticeSession<R>, volume: u8) {
    if let Some(note) = session.current().and_then(catalog::lookup) {
        playback::play_note_detached(note, volume);
    }
}

fn status_line<R: Rng>(session: &PracticeSession<R>, mic_error: Option<&str>) -> Line<'static> {
    let (text, color) = match (session.visual(), mic_error) {
        (VisualState::Correct, _) => ("Correct! Well done!".to_string(), Color::Green),
        (VisualState::Wrong, _) => (
            match session.ghost() {
                Some(note) => format!("Wrong note ({note}). Try again!"),
                None => "Wrong note. Try again!".to_string(),
            },
            Color::Red,
        ),
        (VisualState::Idle, None) => ("Play the note shown above".to_string(), Color::LightBlue),
        (VisualState::Idle, Some(err)) => (
            format!("Microphone unavailable ({err}). Use [t] to answer, [Space] to skip."),
            Color::Yellow,
        ),
    };
    Line::from(Span::styled(
        format!("  {text}"),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn render_practice<R: Rng>(
    frame: &mut ratatui::Frame,
    area: Rect,
    session: &PracticeSession<R>,
    status: &Line<'static>,
    large_notes: bool,
) {
    let outer = Block::default()
        .title(" Note Trainer ")
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::White));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let rows = Layout::vertical([
        Constraint::Length(1), // score + mode
        Constraint::Min(8),    // staff
        Constraint::Length(1), // status
        Constraint::Length(1), // key hint
    ])
    .split(inner);

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("  Score: {}", session.score()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("   Misses: {}", session.wrong_answers().values().sum::<u32>()),
            Style::default().fg(Color::Red),
        ),
        Span::styled(
            format!(
                "   Mode: {}{}",
                session.mode().name(),
                if session.is_adaptive() { " (adaptive)" } else { "" }
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    frame.render_widget(header, rows[0]);

    let display = NoteDisplayWidget::new(session.mode().clef(), session.current(), session.visual())
        .with_ghost(session.ghost())
        .with_hint(session.showing_hint())
        .large(large_notes);
    frame.render_widget(display, rows[1]);

    frame.render_widget(Paragraph::new(status.clone()), rows[2]);

    let key = |k: &'static str| {
        Span::styled(k, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    };
    let hint = Paragraph::new(Line::from(vec![
        key("  [Space]"),
        Span::raw(" skip  "),
        key("[p]"),
        Span::raw(" play  "),
        key("[h]"),
        Span::raw(" hint  "),
        key("[t]"),
        Span::raw(" test  "),
        key("[s]"),
        Span::raw(" stats  "),
        key("[q]"),
        Span::raw(" quit"),
    ]));
    frame.render_widget(hint, rows[3]);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}
