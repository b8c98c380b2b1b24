use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::storage::kv::{KeyValueStore, STATS_KEY};

/// Accuracy assumed for a note nobody has attempted yet.
pub const NEUTRAL_ACCURACY: f64 = 0.5;

/// Running record for one note.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoteStatistics {
    pub attempts: u32,
    /// Always <= attempts
    pub correct: u32,
    pub last_practiced: Option<DateTime<Utc>>,
}

impl NoteStatistics {
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            NEUTRAL_ACCURACY
        } else {
            self.correct as f64 / self.attempts as f64
        }
    }
}

/// Persisted layout: three note-keyed lists of pairs, sorted by note name.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressBlob {
    #[serde(default)]
    note_attempts: Vec<(String, u32)>,
    #[serde(default)]
    note_correct: Vec<(String, u32)>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    last_practiced: Vec<(String, i64)>,
}

/// Per-note practice history, saved to the store after every change.
pub struct PracticeStats {
    store: Box<dyn KeyValueStore>,
    notes: BTreeMap<String, NoteStatistics>,
}

impl PracticeStats {
    /// Restore statistics from `store`.
    ///
    /// A missing, unreadable or corrupt blob yields an empty history; the
    /// problem is logged and never returned to the caller.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let notes = match store.load(STATS_KEY) {
            Ok(Some(blob)) => match decode(&blob) {
                Ok(notes) => notes,
                Err(e) => {
                    warn!("discarding corrupt practice statistics: {e:#}");
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!("failed to read practice statistics, starting fresh: {e:#}");
                BTreeMap::new()
            }
        };
        Self { store, notes }
    }

    /// Create empty records for notes entering the practice range.
    pub fn ensure_notes(&mut self, names: &[&str]) {
        for name in names {
            self.notes.entry((*name).to_string()).or_default();
        }
    }

    pub fn get(&self, name: &str) -> NoteStatistics {
        self.notes.get(name).copied().unwrap_or_default()
    }

    pub fn accuracy(&self, name: &str) -> f64 {
        self.get(name).accuracy()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.values().all(|s| s.attempts == 0)
    }

    /// All tracked notes, by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NoteStatistics)> {
        self.notes.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    /// Record one judged attempt now and save.
    pub fn record_attempt(&mut self, name: &str, was_correct: bool) {
        self.record_attempt_at(name, was_correct, Utc::now());
    }

    /// Record one judged attempt at `at` and save.
    ///
    /// A failed save is logged; the in-memory update stands and goes out
    /// with the next successful save.
    pub fn record_attempt_at(&mut self, name: &str, was_correct: bool, at: DateTime<Utc>) {
        let entry = self.notes.entry(name.to_string()).or_default();
        entry.attempts += 1;
        if was_correct {
            entry.correct += 1;
        }
        entry.last_practiced = Some(at);

        if let Err(e) = self.save() {
            warn!("failed to save practice statistics: {e:#}");
        }
    }

    /// Write the full history to the store.
    pub fn save(&mut self) -> Result<()> {
        let blob = encode(&self.notes)?;
        self.store.save(STATS_KEY, &blob)
    }

    /// Forget all history and save the empty state.
    pub fn clear(&mut self) -> Result<()> {
        self.notes.clear();
        self.save()
    }
}

fn encode(notes: &BTreeMap<String, NoteStatistics>) -> Result<String> {
    let mut blob = ProgressBlob::default();
    for (name, stats) in notes {
        blob.note_attempts.push((name.clone(), stats.attempts));
        blob.note_correct.push((name.clone(), stats.correct));
        if let Some(at) = stats.last_practiced {
            blob.last_practiced.push((name.clone(), at.timestamp_millis()));
        }
    }
    serde_json::to_string(&blob).context("Failed to serialize practice statistics")
}

fn decode(blob: &str) -> Result<BTreeMap<String, NoteStatistics>> {
    let blob: ProgressBlob =
        serde_json::from_str(blob).context("Failed to parse practice statistics")?;

    let mut notes: BTreeMap<String, NoteStatistics> = BTreeMap::new();
    for (name, attempts) in blob.note_attempts {
        notes.entry(name).or_default().attempts = attempts;
    }
    for (name, correct) in blob.note_correct {
        notes.entry(name).or_default().correct = correct;
    }
    for (name, millis) in blob.last_practiced {
        let at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .with_context(|| format!("Invalid timestamp for {name}: {millis}"))?;
        notes.entry(name).or_default().last_practiced = Some(at);
    }

    for (name, stats) in notes.iter_mut() {
        if stats.correct > stats.attempts {
            warn!(
                "{name}: {} correct out of {} attempts, clamping",
                stats.correct, stats.attempts
            );
            stats.correct = stats.attempts;
        }
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::storage::kv::SqliteStore;

    /// Store whose contents outlive the `PracticeStats` using it, so tests
    /// can reload from the same blob.
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<Option<String>>>);

    impl KeyValueStore for SharedStore {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            Ok(self.0.borrow().clone())
        }

        fn save(&mut self, _key: &str, blob: &str) -> Result<()> {
            *self.0.borrow_mut() = Some(blob.to_string());
            Ok(())
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("disk on fire")
        }

        fn save(&mut self, _key: &str, _blob: &str) -> Result<()> {
            anyhow::bail!("disk on fire")
        }
    }

    fn empty() -> PracticeStats {
        PracticeStats::load(Box::new(SqliteStore::open_in_memory().unwrap()))
    }

    #[test]
    fn unseen_notes_have_neutral_accuracy() {
        let mut stats = empty();
        stats.ensure_notes(&["C4", "D4"]);
        for name in ["C4", "D4", "B2"] {
            assert_eq!(stats.accuracy(name), 0.5);
        }
    }

    #[test]
    fn record_attempt_counts() {
        let mut stats = empty();
        stats.record_attempt("A4", true);
        stats.record_attempt("A4", false);
        stats.record_attempt("A4", true);
        let a4 = stats.get("A4");
        assert_eq!(a4.attempts, 3);
        assert_eq!(a4.correct, 2);
        assert!(a4.last_practiced.is_some());
        assert!((stats.accuracy("A4") - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn correct_never_exceeds_attempts() {
        let mut stats = empty();
        let outcomes = [true, false, true, true, false, false, true];
        for (i, &ok) in outcomes.iter().enumerate() {
            let note = ["C4", "E4", "G4"][i % 3];
            stats.record_attempt(note, ok);
            for (_, s) in stats.iter() {
                assert!(s.correct <= s.attempts);
            }
        }
    }

    #[test]
    fn roundtrip_through_store() {
        let shared = SharedStore::default();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        {
            let mut stats = PracticeStats::load(Box::new(shared.clone()));
            for i in 0..7 {
                stats.record_attempt_at("G4", i < 5, at);
            }
        }
        let reloaded = PracticeStats::load(Box::new(shared));
        let g4 = reloaded.get("G4");
        assert_eq!(g4.attempts, 7);
        assert_eq!(g4.correct, 5);
        assert_eq!(g4.last_practiced, Some(at));
    }

    #[test]
    fn ensured_notes_are_persisted_on_next_save() {
        let shared = SharedStore::default();
        let mut stats = PracticeStats::load(Box::new(shared.clone()));
        stats.ensure_notes(&["F4"]);
        stats.record_attempt("A4", true);
        let reloaded = PracticeStats::load(Box::new(shared));
        assert_eq!(reloaded.get("F4").attempts, 0);
        assert_eq!(reloaded.iter().count(), 2);
    }

    #[test]
    fn corrupt_blob_gives_empty_store() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save(STATS_KEY, "{\"noteAttempts\": [[\"C4\"").unwrap();
        let stats = PracticeStats::load(Box::new(store));
        assert!(stats.is_empty());
        assert_eq!(stats.iter().count(), 0);
    }

    #[test]
    fn wrong_shape_blob_gives_empty_store() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save(STATS_KEY, "[1, 2, 3]").unwrap();
        assert!(PracticeStats::load(Box::new(store)).is_empty());
    }

    #[test]
    fn unreadable_store_gives_empty_store() {
        let mut stats = PracticeStats::load(Box::new(FailingStore));
        assert!(stats.is_empty());
        // Saving fails too, but recording still works in memory
        stats.record_attempt("C4", true);
        assert_eq!(stats.get("C4").attempts, 1);
    }

    #[test]
    fn inconsistent_counts_are_clamped() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .save(
                STATS_KEY,
                r#"{"noteAttempts": [["C4", 2]], "noteCorrect": [["C4", 5]], "lastPracticed": []}"#,
            )
            .unwrap();
        let stats = PracticeStats::load(Box::new(store));
        assert_eq!(stats.get("C4").correct, 2);
    }

    #[test]
    fn blob_layout_is_ordered_pairs() {
        let mut notes = BTreeMap::new();
        notes.insert(
            "G4".to_string(),
            NoteStatistics {
                attempts: 7,
                correct: 5,
                last_practiced: Utc.timestamp_millis_opt(1_000).single(),
            },
        );
        notes.insert("C4".to_string(), NoteStatistics::default());
        let json: serde_json::Value = serde_json::from_str(&encode(&notes).unwrap()).unwrap();
        assert_eq!(json["noteAttempts"], serde_json::json!([["C4", 0], ["G4", 7]]));
        assert_eq!(json["noteCorrect"], serde_json::json!([["C4", 0], ["G4", 5]]));
        assert_eq!(json["lastPracticed"], serde_json::json!([["G4", 1000]]));
    }

    #[test]
    fn clear_forgets_history() {
        let mut stats = empty();
        stats.record_attempt("C4", false);
        stats.clear().unwrap();
        assert!(stats.is_empty());
        assert_eq!(stats.get("C4").attempts, 0);
    }
}
