//! Five-signal fusion (spec §4.7): semantic embedding cosine, exact
//! normalized string match, fuzzy string similarity, numbered-device
//! parsing, and area prior, combined by fixed configured weights.

use super::numbered_suffix;
use super::EntityRegistryEntry;
use crate::config::ResolverConfig;
use crate::math::similarity::cosine_similarity;
use crate::types::{AliasMap, EntityId};
use strsim::normalized_levenshtein;

/// Outcome of resolving a single free-form token against the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// Score >= `accept_score_floor` AND margin over the runner-up >=
    /// `accept_margin_floor`, or an `AliasMap` pre-emption (score fixed at `1.0`).
    Accepted { entity_id: EntityId, score: f64 },
    /// No candidate cleared both the floor and margin; the full ranked list
    /// is handed to C8 for clarification.
    Ambiguous { candidates: Vec<(EntityId, f64)> },
    /// The registry is empty or nothing scored above `0.0`.
    NoMatch,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace(['_', '-'], " ")
}

/// Raw (pre-weight) score for one signal; each is already in `[0,1]`, so the
/// weighted sum is in `[0,1]` too (spec: "the sum is rescaled to [0,1]" —
/// automatic here since the five weights sum to `1.0`).
fn signal_scores(
    token: &str,
    query_embedding: Option<&[f32]>,
    query_area: Option<&str>,
    candidate: &EntityRegistryEntry,
) -> (f64, f64, f64, f64, f64) {
    let semantic = match (query_embedding, candidate.embedding.as_deref()) {
        (Some(q), Some(c)) => cosine_similarity(q, c),
        _ => 0.0,
    };

    let token_norm = normalize(token);
    let exact = if token_norm == normalize(&candidate.display_name)
        || token_norm == normalize(candidate.entity_id.as_str())
    {
        1.0
    } else {
        0.0
    };

    let fuzzy = normalized_levenshtein(&token_norm, &normalize(&candidate.display_name));

    let numbered = numbered_suffix::score(token, &candidate.display_name, candidate.entity_id.as_str());

    let area_prior = match (query_area, &candidate.area) {
        (Some(q), Some(a)) if normalize(q) == normalize(a) => 1.0,
        _ => 0.0,
    };

    (semantic, exact, fuzzy, numbered, area_prior)
}

/// Weighted fusion score for one candidate (spec §4.7 fusion weights).
#[must_use]
fn fused_score(
    token: &str,
    query_embedding: Option<&[f32]>,
    query_area: Option<&str>,
    candidate: &EntityRegistryEntry,
    config: &ResolverConfig,
) -> f64 {
    let (semantic, exact, fuzzy, numbered, area) =
        signal_scores(token, query_embedding, query_area, candidate);
    (config.weight_semantic * semantic
        + config.weight_exact * exact
        + config.weight_fuzzy * fuzzy
        + config.weight_numbered_suffix * numbered
        + config.weight_area_prior * area)
        .clamp(0.0, 1.0)
}

/// Resolves `token` against `registry`. AliasMap lookups pre-empt the fusion
/// pipeline entirely (spec: "a registered alias produces an immediate
/// accept with score 1.0").
///
/// Determinism (spec §4.7): for fixed inputs and embedding model version,
/// scores are a pure function of `token`/`query_embedding`/`query_area`
/// and the registry — no randomness, no wall-clock dependency.
#[must_use]
pub fn resolve(
    token: &str,
    query_embedding: Option<&[f32]>,
    query_area: Option<&str>,
    registry: &[EntityRegistryEntry],
    aliases: &[AliasMap],
    user_id: &str,
    config: &ResolverConfig,
) -> ResolveOutcome {
    let token_norm = normalize(token);
    if let Some(alias) = aliases
        .iter()
        .find(|a| a.user_id == user_id && normalize(&a.alias) == token_norm)
    {
        return ResolveOutcome::Accepted {
            entity_id: alias.target_entity_id.clone(),
            score: 1.0,
        };
    }

    let mut scored: Vec<(EntityId, f64)> = registry
        .iter()
        .map(|candidate| {
            (
                candidate.entity_id.clone(),
                fused_score(token, query_embedding, query_area, candidate, config),
            )
        })
        .filter(|(_, score)| *score > 0.0)
        .collect();

    if scored.is_empty() {
        return ResolveOutcome::NoMatch;
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let best = scored[0].1;
    let runner_up = scored.get(1).map_or(0.0, |(_, s)| *s);
    if best >= config.accept_score_floor && best - runner_up >= config.accept_margin_floor {
        ResolveOutcome::Accepted { entity_id: scored[0].0.clone(), score: best }
    } else {
        ResolveOutcome::Ambiguous { candidates: scored }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, name: &str, area: Option<&str>) -> EntityRegistryEntry {
        EntityRegistryEntry {
            entity_id: EntityId::new(id).unwrap(),
            display_name: name.to_string(),
            area: area.map(str::to_string),
            embedding: None,
        }
    }

    #[test]
    fn alias_preempts_fusion_with_perfect_score() {
        let aliases = vec![AliasMap {
            user_id: "u1".to_string(),
            alias: "my light".to_string(),
            target_entity_id: EntityId::new("light.office").unwrap(),
            created_at: Utc::now(),
        }];
        let registry = vec![entry("light.office", "Office Light", None)];
        let config = ResolverConfig::default();

        let outcome = resolve("my light", None, None, &registry, &aliases, "u1", &config);
        assert_eq!(
            outcome,
            ResolveOutcome::Accepted {
                entity_id: EntityId::new("light.office").unwrap(),
                score: 1.0
            }
        );
    }

    #[test]
    fn exact_match_is_accepted() {
        let registry = vec![
            entry("light.office", "Office Light", None),
            entry("light.garage", "Garage Light", None),
        ];
        let config = ResolverConfig::default();
        let outcome = resolve("Office Light", None, None, &registry, &[], "u1", &config);
        match outcome {
            ResolveOutcome::Accepted { entity_id, score } => {
                assert_eq!(entity_id, EntityId::new("light.office").unwrap());
                assert!(score >= config.accept_score_floor);
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[test]
    fn close_scores_are_ambiguous() {
        let registry = vec![
            entry("light.office_1", "Office Light 1", None),
            entry("light.office_2", "Office Light 1", None),
        ];
        let config = ResolverConfig::default();
        let outcome = resolve("Office Light 1", None, None, &registry, &[], "u1", &config);
        assert!(matches!(outcome, ResolveOutcome::Ambiguous { .. }));
    }

    #[test]
    fn no_candidate_scores_above_zero_is_no_match() {
        // Same length, every character differs: normalized Levenshtein
        // similarity is exactly 0.0, and no other signal can contribute
        // without an embedding, a shared area, or a trailing number.
        let registry = vec![entry("light.office", "xyzxyz", None)];
        let config = ResolverConfig::default();
        let outcome = resolve("abcabc", None, None, &registry, &[], "u1", &config);
        assert_eq!(outcome, ResolveOutcome::NoMatch);
    }
}
