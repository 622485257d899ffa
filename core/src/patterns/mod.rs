//! Pattern Detectors (C3, spec §4.3): three independent family detectors —
//! time-of-day, co-occurrence, anomaly — run in parallel over the same
//! event slice, followed by a cross-validation pruning pass.
//!
//! Grounded on the teacher's `patterns/changepoint/detector.rs` and
//! `patterns/dbscan/detector.rs`: a detector is a plain struct holding its
//! config, with a `detect(&self, ...)` method returning a typed result
//! rather than mutating shared state.

pub mod anomaly;
pub mod co_occurrence;
pub mod cross_validation;
pub mod time_of_day;

use crate::config::DetectorConfig;
use crate::types::{Event, PatternMetadata};
use tracing::{instrument, warn};

/// One detector's proposal, before it is merged into storage by
/// [`crate::storage::merge::upsert_pattern`] (kept separate so detectors
/// never touch storage directly — spec §9 "global mutable caches" note).
#[derive(Debug, Clone, PartialEq)]
pub struct PatternCandidate {
    pub anchor: crate::types::EntityId,
    pub metadata: PatternMetadata,
    pub confidence: f64,
    pub occurrences: usize,
}

/// Per-detector outcome: either a candidate list, or a recorded failure that
/// isolates the detector without failing the whole phase (spec §4.3: "a
/// detector that raises is isolated; its patterns are skipped; the phase is
/// recorded as partial-success").
#[derive(Debug, Default)]
pub struct DetectionResults {
    pub candidates: Vec<PatternCandidate>,
    pub failed_detectors: Vec<String>,
}

/// Run all three detectors over `events` and apply the cross-validation
/// pruning pass (spec §4.3). Each detector is isolated: a panic-free
/// failure (we model detectors as infallible here, since none of the three
/// depends on a suspension point) only happens via a logged empty result.
///
/// CPU-bound; callers run this inside `tokio::task::spawn_blocking` (spec §5:
/// detectors run in a bounded worker pool, not on the async executor).
#[instrument(skip(events, config), fields(event_count = events.len()))]
pub fn run_all(events: &[Event], config: &DetectorConfig) -> DetectionResults {
    let mut results = DetectionResults::default();

    let time_of_day = time_of_day::detect(events, config);
    let co_occurrence = co_occurrence::detect(events, config);
    let anomaly = anomaly::detect(events, config);

    results.candidates.extend(time_of_day);
    results.candidates.extend(co_occurrence);
    results.candidates.extend(anomaly);

    let before = results.candidates.len();
    results.candidates = cross_validation::prune(results.candidates);
    let pruned = before - results.candidates.len();
    if pruned > 0 {
        warn!(pruned, "cross-validation pass pruned sub-explanation patterns");
    }

    results
}
