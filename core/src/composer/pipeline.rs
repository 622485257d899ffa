//! Stages 2-5 of the ranking pipeline (spec §4.6 items 2-5).

use super::scoring::{base_score, centrality_map, CandidateSource};
use crate::capability::FeatureCandidate;
use crate::config::{ComposerConfig, CreativityLevel, BlueprintPreference};
use crate::types::{EntityId, Pattern, PriorityWeights, Synergy, SynergyKind};
use chrono::{DateTime, Utc};

/// A candidate surviving through (or produced by) the pipeline, carrying
/// both its base score and the running re-ranked score.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub source: CandidateSource,
    pub devices_involved: Vec<EntityId>,
    pub confidence: f64,
    pub score: f64,
}

/// Synergy kinds treated as matching a known community automation template
/// (spec §4.6 item 3): direct device pairings and multi-hop chains mirror
/// common community blueprints; context-conditioned synergies do not
/// correspond to an off-the-shelf template.
fn matches_known_template(kind: SynergyKind) -> bool {
    matches!(kind, SynergyKind::DevicePair | SynergyKind::DeviceChain)
}

fn creativity_floor(level: CreativityLevel, config: &ComposerConfig) -> f64 {
    match level {
        CreativityLevel::Conservative => config.creativity_floor_conservative,
        CreativityLevel::Balanced => config.creativity_floor_balanced,
        CreativityLevel::Creative => config.creativity_floor_creative,
    }
}

fn blueprint_multiplier(preference: BlueprintPreference, config: &ComposerConfig) -> f64 {
    match preference {
        BlueprintPreference::Low => config.blueprint_multiplier_low,
        BlueprintPreference::Medium => config.blueprint_multiplier_medium,
        BlueprintPreference::High => config.blueprint_multiplier_high,
    }
}

/// Runs stages 1-5 of spec §4.6: scoring, creativity filter,
/// preference-weighted re-rank, subset deduplication, and the
/// `max_suggestions` cap.
#[must_use]
pub fn select(
    patterns: Vec<Pattern>,
    synergies: Vec<Synergy>,
    features: Vec<FeatureCandidate>,
    now: DateTime<Utc>,
    creativity: CreativityLevel,
    blueprint_preference: BlueprintPreference,
    max_suggestions: usize,
    priority_weights: &PriorityWeights,
    config: &ComposerConfig,
) -> Vec<RankedCandidate> {
    let centrality = centrality_map(&synergies);

    let mut candidates: Vec<RankedCandidate> = Vec::new();
    for pattern in patterns {
        let source = CandidateSource::Pattern(pattern);
        let score = base_score(&source, now, priority_weights, &centrality);
        let confidence = source.confidence();
        let devices_involved = source.devices_involved();
        candidates.push(RankedCandidate { source, devices_involved, confidence, score });
    }
    for synergy in synergies {
        let source = CandidateSource::Synergy(synergy);
        let score = base_score(&source, now, priority_weights, &centrality);
        let confidence = source.confidence();
        let devices_involved = source.devices_involved();
        candidates.push(RankedCandidate { source, devices_involved, confidence, score });
    }
    for feature in features {
        let source = CandidateSource::Feature(feature);
        let score = base_score(&source, now, priority_weights, &centrality);
        let confidence = source.confidence();
        let devices_involved = source.devices_involved();
        candidates.push(RankedCandidate { source, devices_involved, confidence, score });
    }

    // Stage 2: creativity filter.
    let floor = creativity_floor(creativity, config);
    candidates.retain(|c| c.confidence >= floor);

    // Stage 3: preference-weighted re-rank.
    let multiplier = blueprint_multiplier(blueprint_preference, config);
    for candidate in &mut candidates {
        if let CandidateSource::Synergy(synergy) = &candidate.source {
            if matches_known_template(synergy.kind) {
                candidate.score *= multiplier;
            }
        }
    }

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    // Stage 4: deduplication. A candidate whose devices are a subset of an
    // already-selected, higher-scored candidate's devices is dropped.
    let mut kept: Vec<RankedCandidate> = Vec::new();
    for candidate in candidates {
        let subsumed = kept.iter().any(|existing| {
            candidate
                .devices_involved
                .iter()
                .all(|d| existing.devices_involved.contains(d))
                && candidate.score <= existing.score
        });
        if !subsumed {
            kept.push(candidate);
        }
    }

    // Stage 5: cap.
    kept.truncate(max_suggestions);
    kept
}
