use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use super::selector::{self, DEFAULT_WEAKEST_LIMIT};
use super::store::PracticeStats;

/// One line of the "notes to practise" list.
#[derive(Debug, Clone, PartialEq)]
pub struct WeakNote {
    pub name: String,
    pub accuracy: f64,
    pub attempts: u32,
}

/// Snapshot of progress over a practice range.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSummary {
    pub score: u32,
    pub attempts: u32,
    pub correct: u32,
    /// Weakest attempted notes, least accurate first
    pub weakest: Vec<WeakNote>,
}

impl ProgressSummary {
    pub fn build(range: &[&str], stats: &PracticeStats, score: u32) -> Self {
        let (attempts, correct) = range.iter().fold((0, 0), |(a, c), name| {
            let s = stats.get(name);
            (a + s.attempts, c + s.correct)
        });

        let attempted: Vec<&str> = range
            .iter()
            .copied()
            .filter(|name| stats.get(name).attempts > 0)
            .collect();
        let weakest = selector::weakest_notes(&attempted, stats, DEFAULT_WEAKEST_LIMIT)
            .into_iter()
            .map(|name| {
                let s = stats.get(name);
                WeakNote {
                    name: name.to_string(),
                    accuracy: s.accuracy(),
                    attempts: s.attempts,
                }
            })
            .collect();

        Self {
            score,
            attempts,
            correct,
            weakest,
        }
    }

    /// Overall accuracy across the range, if anything was attempted.
    pub fn accuracy(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.correct as f64 / self.attempts as f64)
    }

    /// Plain-text report, one item per line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Current score: {}", self.score)];
        match self.accuracy() {
            Some(acc) => lines.push(format!(
                "Overall: {}/{} correct ({:.1}%)",
                self.correct,
                self.attempts,
                acc * 100.0
            )),
            None => lines.push("Overall: no attempts yet".to_string()),
        }
        lines.push(String::new());

        if self.weakest.is_empty() {
            lines.push("Great job! Keep practising to see detailed stats.".to_string());
        } else {
            lines.push("Notes to practise:".to_string());
            for note in &self.weakest {
                lines.push(format!(
                    "  {:<3} {:>5.1}%  ({} attempts)",
                    note.name,
                    note.accuracy * 100.0,
                    note.attempts
                ));
            }
        }
        lines
    }

    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument {
    note_attempts: BTreeMap<String, u32>,
    note_correct: BTreeMap<String, u32>,
    /// Milliseconds since the Unix epoch
    last_practiced: BTreeMap<String, i64>,
}

/// Full history as a JSON document keyed by note name.
pub fn export_json(stats: &PracticeStats) -> Result<String> {
    let mut doc = ExportDocument {
        note_attempts: BTreeMap::new(),
        note_correct: BTreeMap::new(),
        last_practiced: BTreeMap::new(),
    };
    for (name, s) in stats.iter() {
        doc.note_attempts.insert(name.to_string(), s.attempts);
        doc.note_correct.insert(name.to_string(), s.correct);
        if let Some(at) = s.last_practiced {
            doc.last_practiced.insert(name.to_string(), at.timestamp_millis());
        }
    }
    serde_json::to_string_pretty(&doc).context("Failed to serialize export")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::storage::kv::SqliteStore;

    fn stats_with(records: &[(&str, u32, u32)]) -> PracticeStats {
        let mut stats = PracticeStats::load(Box::new(SqliteStore::open_in_memory().unwrap()));
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        for &(name, attempts, correct) in records {
            for i in 0..attempts {
                stats.record_attempt_at(name, i < correct, at);
            }
        }
        stats
    }

    #[test]
    fn empty_history_has_no_weak_notes() {
        let stats = stats_with(&[]);
        let summary = ProgressSummary::build(&["C4", "D4"], &stats, 0);
        assert!(summary.weakest.is_empty());
        assert!(summary.accuracy().is_none());
        assert!(summary.lines().iter().any(|l| l.contains("Great job")));
    }

    #[test]
    fn totals_cover_only_the_range() {
        let stats = stats_with(&[("C4", 4, 3), ("D4", 2, 1), ("G2", 10, 0)]);
        let summary = ProgressSummary::build(&["C4", "D4"], &stats, 4);
        assert_eq!(summary.attempts, 6);
        assert_eq!(summary.correct, 4);
        assert_eq!(summary.score, 4);
    }

    #[test]
    fn weakest_skips_unattempted_notes() {
        let stats = stats_with(&[("C4", 4, 1), ("E4", 4, 4)]);
        let summary = ProgressSummary::build(&["C4", "D4", "E4"], &stats, 0);
        let names: Vec<&str> = summary.weakest.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["C4", "E4"]);
        assert!((summary.weakest[0].accuracy - 0.25).abs() < 1e-9);
    }

    #[test]
    fn report_lines_show_percentages() {
        let stats = stats_with(&[("A4", 4, 1)]);
        let summary = ProgressSummary::build(&["A4"], &stats, 1);
        let lines = summary.lines();
        assert!(lines.iter().any(|l| l.contains("A4") && l.contains("25.0%")));
        assert!(lines.iter().any(|l| l.contains("1/4")));
        assert!(summary.render().starts_with("Current score: 1\n"));
    }

    #[test]
    fn export_is_keyed_by_note() {
        let stats = stats_with(&[("G4", 7, 5)]);
        let json: serde_json::Value = serde_json::from_str(&export_json(&stats).unwrap()).unwrap();
        assert_eq!(json["noteAttempts"]["G4"], 7);
        assert_eq!(json["noteCorrect"]["G4"], 5);
        assert!(json["lastPracticed"]["G4"].is_i64());
    }
}
