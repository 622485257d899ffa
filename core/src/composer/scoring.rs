//! Stage 1: base scoring (spec §4.6 item 1).

use crate::capability::FeatureCandidate;
use crate::types::{EntityId, Pattern, PriorityWeights, Synergy};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// What a composer candidate is grounded in; carried through the pipeline
/// so [`super::describe::compose_description`] can build an adapter brief
/// and a template fallback without re-deriving it from the score alone.
#[derive(Debug, Clone)]
pub enum CandidateSource {
    Pattern(Pattern),
    Synergy(Synergy),
    Feature(FeatureCandidate),
}

impl CandidateSource {
    #[must_use]
    pub fn devices_involved(&self) -> Vec<EntityId> {
        match self {
            CandidateSource::Pattern(p) => vec![p.anchor.clone()],
            CandidateSource::Synergy(s) => s.chain.clone(),
            CandidateSource::Feature(f) => {
                vec![EntityId::new(f.device_id.as_str()).expect("device id is never empty")]
            }
        }
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self {
            CandidateSource::Pattern(p) => p.confidence(),
            CandidateSource::Synergy(s) => s.confidence(),
            CandidateSource::Feature(_) => 1.0,
        }
    }
}

/// Exponential recency decay with a 14-day half-scale: a pattern re-observed
/// today scores at full confidence, one not re-observed in weeks decays
/// toward (but never below) a floor so old-but-real patterns aren't dropped
/// outright by recency alone.
fn recency_weight(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    const HALF_SCALE_DAYS: f64 = 14.0;
    const FLOOR: f64 = 0.30;
    let days = (now - last_seen).num_seconds().max(0) as f64 / 86_400.0;
    (FLOOR + (1.0 - FLOOR) * 0.5f64.powf(days / HALF_SCALE_DAYS)).clamp(FLOOR, 1.0)
}

/// Device centrality: how often a device appears across the synergy set,
/// normalized to `[0,1]`. Devices absent from every synergy get `0.0`.
#[must_use]
pub fn centrality_map(synergies: &[Synergy]) -> HashMap<EntityId, f64> {
    let mut counts: HashMap<EntityId, usize> = HashMap::new();
    for synergy in synergies {
        for device in &synergy.chain {
            *counts.entry(device.clone()).or_default() += 1;
        }
    }
    let max = counts.values().copied().max().unwrap_or(1).max(1) as f64;
    counts.into_iter().map(|(k, v)| (k, v as f64 / max)).collect()
}

/// Base score per source (spec §4.6 item 1):
/// - pattern: `confidence * recency_weight`
/// - synergy: the §3 priority formula
/// - feature: `utilization_gap * device_centrality`
#[must_use]
pub fn base_score(
    source: &CandidateSource,
    now: DateTime<Utc>,
    weights: &PriorityWeights,
    centrality: &HashMap<EntityId, f64>,
) -> f64 {
    match source {
        CandidateSource::Pattern(p) => p.confidence() * recency_weight(p.last_seen, now),
        CandidateSource::Synergy(s) => s.priority(weights),
        CandidateSource::Feature(f) => {
            let device = EntityId::new(f.device_id.as_str()).expect("device id is never empty");
            let centrality = centrality.get(&device).copied().unwrap_or(0.0);
            f.utilization_gap * centrality
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Complexity, EntityId as Id, SynergyKind};

    #[test]
    fn recency_weight_decays_toward_floor() {
        let now = Utc::now();
        let fresh = recency_weight(now, now);
        let stale = recency_weight(now - chrono::Duration::days(90), now);
        assert!((fresh - 1.0).abs() < 1e-9);
        assert!(stale < fresh);
        assert!(stale >= 0.30);
    }

    #[test]
    fn centrality_normalizes_to_unit_interval() {
        let synergy = Synergy::new(
            SynergyKind::DevicePair,
            vec![Id::new("a").unwrap(), Id::new("b").unwrap()],
            0.5,
            0.5,
            Complexity::Low,
            0.5,
            true,
            vec![],
        )
        .unwrap();
        let map = centrality_map(std::slice::from_ref(&synergy));
        assert_eq!(map[&Id::new("a").unwrap()], 1.0);
        assert_eq!(map[&Id::new("b").unwrap()], 1.0);
    }
}
