use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info};
use rand::Rng;

use crate::config::PracticeConfig;
use crate::notes::PracticeMode;
use crate::stats::selector;
use crate::stats::{PracticeStats, ProgressSummary};

/// How the target note should currently be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualState {
    Idle,
    Correct,
    Wrong,
}

/// Outcome of feeding one detected note into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgement {
    Correct,
    Wrong,
    /// Arrived during a cooldown or while waiting to advance
    Ignored,
}

/// One practice run: the note on screen, the score, and the timers that
/// pace answers.
///
/// Time is passed in by the caller; the session never reads the clock for
/// pacing, which keeps it deterministic under test.
pub struct PracticeSession<R: Rng> {
    stats: PracticeStats,
    mode: PracticeMode,
    adaptive: bool,
    advance_delay: Duration,
    wrong_cooldown: Duration,
    rng: R,

    score: u32,
    current: Option<&'static str>,
    visual: VisualState,
    ghost: Option<&'static str>,
    wrong_answers: BTreeMap<&'static str, u32>,
    showing_hint: bool,
    advance_at: Option<Instant>,
    cooldown_until: Option<Instant>,
}

impl<R: Rng> PracticeSession<R> {
    pub fn new(
        stats: PracticeStats,
        mode: PracticeMode,
        adaptive: bool,
        timing: &PracticeConfig,
        rng: R,
    ) -> Self {
        Self {
            stats,
            mode,
            adaptive,
            advance_delay: timing.advance_delay(),
            wrong_cooldown: timing.wrong_cooldown(),
            rng,
            score: 0,
            current: None,
            visual: VisualState::Idle,
            ghost: None,
            wrong_answers: BTreeMap::new(),
            showing_hint: false,
            advance_at: None,
            cooldown_until: None,
        }
    }

    /// Make sure every note in range has a record, then show the first note.
    pub fn start(&mut self) {
        self.stats.ensure_notes(self.mode.notes());
        info!(
            "practice started: mode {}, {} selection",
            self.mode.name(),
            if self.adaptive { "adaptive" } else { "uniform" }
        );
        self.next_note();
    }

    /// Choose and show a new target note. Hides the hint.
    pub fn next_note(&mut self) {
        let range = self.mode.notes();
        self.current = if self.adaptive {
            selector::select_next(range, &self.stats, Utc::now(), &mut self.rng)
        } else {
            selector::select_uniform(range, &mut self.rng)
        };
        self.showing_hint = false;
        debug!("next note: {:?}", self.current);
    }

    /// Judge a detected note against the one on screen.
    pub fn on_note_detected(&mut self, detected: &'static str, now: Instant) -> Judgement {
        let Some(target) = self.current else {
            return Judgement::Ignored;
        };
        if self.advance_at.is_some() || self.cooldown_until.is_some_and(|until| now < until) {
            debug!("ignoring {detected} while waiting");
            return Judgement::Ignored;
        }

        if detected == target {
            self.score += 1;
            self.stats.record_attempt(target, true);
            self.visual = VisualState::Correct;
            self.ghost = None;
            self.advance_at = Some(now + self.advance_delay);
            Judgement::Correct
        } else {
            self.stats.record_attempt(target, false);
            *self.wrong_answers.entry(target).or_insert(0) += 1;
            self.visual = VisualState::Wrong;
            self.ghost = Some(detected);
            self.cooldown_until = Some(now + self.wrong_cooldown);
            Judgement::Wrong
        }
    }

    /// Run any timer that has come due. Returns true when a new note was
    /// shown.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.cooldown_until.is_some_and(|until| now >= until) {
            self.cooldown_until = None;
            if self.visual == VisualState::Wrong {
                self.visual = VisualState::Idle;
            }
        }

        match self.advance_at {
            Some(at) if now >= at => {
                self.advance_at = None;
                self.visual = VisualState::Idle;
                self.ghost = None;
                self.next_note();
                true
            }
            _ => false,
        }
    }

    /// Move on without judging the current note.
    pub fn skip(&mut self) {
        self.advance_at = None;
        self.visual = VisualState::Idle;
        self.ghost = None;
        self.next_note();
    }

    pub fn toggle_hint(&mut self) {
        self.showing_hint = !self.showing_hint;
    }

    /// Act as if the displayed note had been played.
    pub fn test_correct(&mut self, now: Instant) -> Judgement {
        match self.current {
            Some(target) => self.on_note_detected(target, now),
            None => Judgement::Ignored,
        }
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::build(self.mode.notes(), &self.stats, self.score)
    }

    pub fn current(&self) -> Option<&'static str> {
        self.current
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn visual(&self) -> VisualState {
        self.visual
    }

    /// The last wrong note played, drawn faintly next to the target.
    pub fn ghost(&self) -> Option<&'static str> {
        self.ghost
    }

    pub fn showing_hint(&self) -> bool {
        self.showing_hint
    }

    /// Wrong answers this session, per target note.
    pub fn wrong_answers(&self) -> &BTreeMap<&'static str, u32> {
        &self.wrong_answers
    }

    #[cfg(test)]
    pub fn stats(&self) -> &PracticeStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::storage::kv::SqliteStore;

    fn session(mode: PracticeMode, adaptive: bool) -> PracticeSession<StdRng> {
        let stats = PracticeStats::load(Box::new(SqliteStore::open_in_memory().unwrap()));
        PracticeSession::new(
            stats,
            mode,
            adaptive,
            &PracticeConfig::default(),
            StdRng::seed_from_u64(42),
        )
    }

    /// A note in the range that differs from `target`.
    fn other_than(mode: PracticeMode, target: &str) -> &'static str {
        mode.notes().iter().copied().find(|n| *n != target).unwrap()
    }

    #[test]
    fn start_shows_a_note_in_range() {
        for adaptive in [true, false] {
            let mut s = session(PracticeMode::BassStaff, adaptive);
            assert!(s.current().is_none());
            s.start();
            let note = s.current().unwrap();
            assert!(PracticeMode::BassStaff.notes().contains(&note));
        }
    }

    #[test]
    fn start_creates_records_for_range() {
        let mut s = session(PracticeMode::TrebleSpaces, true);
        s.start();
        assert_eq!(s.stats().iter().count(), PracticeMode::TrebleSpaces.notes().len());
    }

    #[test]
    fn correct_answer_scores_and_advances_later() {
        let mut s = session(PracticeMode::TrebleAll, false);
        s.start();
        let t0 = Instant::now();
        let target = s.current().unwrap();

        assert_eq!(s.on_note_detected(target, t0), Judgement::Correct);
        assert_eq!(s.score(), 1);
        assert_eq!(s.visual(), VisualState::Correct);
        assert_eq!(s.stats().get(target).correct, 1);

        // Still waiting to advance
        assert!(!s.tick(t0 + Duration::from_millis(500)));
        assert_eq!(s.on_note_detected(target, t0 + Duration::from_millis(600)), Judgement::Ignored);
        assert_eq!(s.score(), 1);

        assert!(s.tick(t0 + Duration::from_millis(1000)));
        assert_eq!(s.visual(), VisualState::Idle);
        assert!(s.current().is_some());
    }

    #[test]
    fn wrong_answer_records_against_target() {
        let mode = PracticeMode::TrebleStaff;
        let mut s = session(mode, false);
        s.start();
        let t0 = Instant::now();
        let target = s.current().unwrap();
        let played = other_than(mode, target);

        assert_eq!(s.on_note_detected(played, t0), Judgement::Wrong);
        assert_eq!(s.score(), 0);
        assert_eq!(s.visual(), VisualState::Wrong);
        assert_eq!(s.ghost(), Some(played));
        assert_eq!(s.wrong_answers().get(target), Some(&1));

        let record = s.stats().get(target);
        assert_eq!((record.attempts, record.correct), (1, 0));
        assert_eq!(s.stats().get(played).attempts, 0);
        // Target stays on screen
        assert_eq!(s.current(), Some(target));
    }

    #[test]
    fn cooldown_ignores_then_accepts() {
        let mode = PracticeMode::TrebleAll;
        let mut s = session(mode, false);
        s.start();
        let t0 = Instant::now();
        let target = s.current().unwrap();
        s.on_note_detected(other_than(mode, target), t0);

        let during = t0 + Duration::from_millis(1499);
        assert_eq!(s.on_note_detected(target, during), Judgement::Ignored);
        s.tick(during);
        assert_eq!(s.visual(), VisualState::Wrong);

        let after = t0 + Duration::from_millis(1500);
        s.tick(after);
        assert_eq!(s.visual(), VisualState::Idle);
        assert_eq!(s.on_note_detected(target, after), Judgement::Correct);
        assert_eq!(s.stats().get(target).attempts, 2);
    }

    #[test]
    fn skip_cancels_pending_advance() {
        let mut s = session(PracticeMode::TrebleAll, false);
        s.start();
        let t0 = Instant::now();
        s.test_correct(t0);
        s.skip();
        assert_eq!(s.visual(), VisualState::Idle);
        // Nothing left to advance
        assert!(!s.tick(t0 + Duration::from_secs(5)));
        assert_eq!(s.score(), 1);
    }

    #[test]
    fn hint_resets_on_new_note() {
        let mut s = session(PracticeMode::TrebleAll, true);
        s.start();
        s.toggle_hint();
        assert!(s.showing_hint());
        s.toggle_hint();
        assert!(!s.showing_hint());
        s.toggle_hint();
        s.next_note();
        assert!(!s.showing_hint());
    }

    #[test]
    fn detection_before_start_is_ignored() {
        let mut s = session(PracticeMode::TrebleAll, true);
        assert_eq!(s.on_note_detected("C4", Instant::now()), Judgement::Ignored);
        assert_eq!(s.test_correct(Instant::now()), Judgement::Ignored);
        assert!(s.stats().is_empty());
    }

    #[test]
    fn summary_reflects_session() {
        let mut s = session(PracticeMode::TrebleAll, false);
        s.start();
        let t0 = Instant::now();
        s.test_correct(t0);
        let summary = s.summary();
        assert_eq!(summary.score, 1);
        assert_eq!(summary.attempts, 1);
        assert_eq!(summary.correct, 1);
    }
}
