//! Weighted note choice that favours what the learner gets wrong.
//!
//! Weight per note:
//!
//! ```text
//! max(0.1, 1 - accuracy)
//!   × 1.5  if fewer than 5 attempts
//!   × 1.2  if never practised or last practised over 5 minutes ago
//! ```
//!
//! The floor keeps mastered notes in rotation; the boosts make sure new and
//! neglected notes come up.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::store::PracticeStats;

pub const MIN_WEIGHT: f64 = 0.1;
pub const UNDER_SAMPLED_ATTEMPTS: u32 = 5;
pub const UNDER_SAMPLED_BOOST: f64 = 1.5;
pub const STALE_BOOST: f64 = 1.2;
pub const DEFAULT_WEAKEST_LIMIT: usize = 5;

fn stale_after() -> Duration {
    Duration::minutes(5)
}

/// Selection weight for one note.
pub fn note_weight(name: &str, stats: &PracticeStats, now: DateTime<Utc>) -> f64 {
    let record = stats.get(name);
    let mut weight = (1.0 - record.accuracy()).max(MIN_WEIGHT);

    if record.attempts < UNDER_SAMPLED_ATTEMPTS {
        weight *= UNDER_SAMPLED_BOOST;
    }

    let stale = match record.last_practiced {
        Some(at) => now.signed_duration_since(at) > stale_after(),
        None => true,
    };
    if stale {
        weight *= STALE_BOOST;
    }

    weight
}

/// Pick the next note to show.
///
/// Draws `r` uniformly from `[0, total weight)` and walks the candidates in
/// order, subtracting each weight; the first note that brings `r` to zero or
/// below wins. Candidate order is preserved, so a seeded `rng` gives a
/// reproducible sequence. Returns None only for an empty candidate list.
pub fn select_next<'a, R: Rng + ?Sized>(
    candidates: &[&'a str],
    stats: &PracticeStats,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<&'a str> {
    if candidates.is_empty() {
        return None;
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|name| note_weight(name, stats, now))
        .collect();
    let total: f64 = weights.iter().sum();

    let mut remaining = rng.gen::<f64>() * total;
    for (name, weight) in candidates.iter().zip(&weights) {
        remaining -= weight;
        if remaining <= 0.0 {
            return Some(*name);
        }
    }

    // Only reachable through rounding error
    select_uniform(candidates, rng)
}

/// Pick any candidate with equal probability.
pub fn select_uniform<'a, R: Rng + ?Sized>(candidates: &[&'a str], rng: &mut R) -> Option<&'a str> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.gen_range(0..candidates.len())])
}

/// Candidates ordered from least to most accurate, at most `limit` of them.
///
/// Unattempted notes rank at the neutral 0.5. Ties keep input order.
pub fn weakest_notes<'a>(candidates: &[&'a str], stats: &PracticeStats, limit: usize) -> Vec<&'a str> {
    let mut ranked: Vec<(&'a str, f64)> = candidates
        .iter()
        .map(|&name| (name, stats.accuracy(name)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.into_iter().take(limit).map(|(name, _)| name).collect()
}
