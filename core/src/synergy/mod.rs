//! Synergy Engine (C4, spec §4.4): four independent layers producing
//! [`Synergy`] candidates over the same pattern/event slice, followed by
//! priority ranking.
//!
//! Grounded on the teacher's `patterns/dbscan/detector.rs` for the
//! "plain struct holding config, `build`/`detect` method" shape, reused here
//! across four small builders instead of one.

pub mod augmentation;
pub mod chain;
pub mod context;
pub mod device_pair;

use crate::config::SynergyConfig;
use crate::types::{Event, Pattern, PriorityWeights, Synergy};
use tracing::instrument;

/// Run all four synergy layers and return every candidate unordered; callers
/// rank with [`rank`] once merged against storage (ranking needs the
/// post-merge confidence, not the just-observed one).
#[instrument(skip(patterns, events, config), fields(pattern_count = patterns.len()))]
pub fn run_all(patterns: &[Pattern], events: &[Event], config: &SynergyConfig) -> Vec<Synergy> {
    let mut synergies = Vec::new();
    synergies.extend(device_pair::build(patterns, config));
    synergies.extend(context::build(events, config));
    synergies.extend(chain::build(patterns, events, config));
    augmentation::apply(&mut synergies, events, config);
    synergies
}

/// Stable sort by descending priority (spec §3 formula), used by C6 when
/// selecting the top suggestions to compose.
pub fn rank(synergies: &mut [Synergy], weights: &PriorityWeights) {
    synergies.sort_by(|a, b| {
        b.priority(weights)
            .partial_cmp(&a.priority(weights))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
