//! Layer 3: multi-hop chain synergies, depth 3 and 4 (spec §4.4 item 3).

use crate::config::SynergyConfig;
use crate::types::{Complexity, Direction, Event, EntityId, Pattern, PatternMetadata, Synergy, SynergyKind};
use std::collections::HashMap;

/// A directed edge `A -> B` with weight `P(B|A within W)`, taken directly
/// from the co-occurrence detector's output (spec §4.4: "Edge weight w(A,B)
/// = P(B|A within W) from the co-occurrence detector").
struct Graph {
    edges: HashMap<(EntityId, EntityId), f64>,
}

impl Graph {
    fn from_patterns(patterns: &[Pattern]) -> Self {
        let mut edges = HashMap::new();
        for pattern in patterns {
            if let PatternMetadata::CoOccurrence { partner, direction, .. } = &pattern.metadata {
                let (from, to) = match direction {
                    Direction::AnchorTriggersPartner => (pattern.anchor.clone(), partner.clone()),
                    Direction::PartnerTriggersAnchor => (partner.clone(), pattern.anchor.clone()),
                };
                edges.insert((from, to), pattern.confidence());
            }
        }
        Self { edges }
    }

    fn weight(&self, from: &EntityId, to: &EntityId) -> Option<f64> {
        self.edges.get(&(from.clone(), to.clone())).copied()
    }

    fn successors(&self, from: &EntityId) -> impl Iterator<Item = (&EntityId, f64)> + '_ {
        self.edges
            .iter()
            .filter(move |((a, _), _)| a == from)
            .map(|((_, b), &w)| (b, w))
    }
}

/// Counts occurrences of `chain` as an in-order sequence within `window` of
/// each hop, via one chronological scan per candidate — acceptable since
/// `min_support_chain` filters the graph down to a small number of
/// candidates before this check runs.
fn sequence_occurrences(events: &[Event], chain: &[EntityId], window: chrono::Duration) -> usize {
    let mut activations: Vec<&Event> = events.iter().filter(|e| e.is_activation()).collect();
    activations.sort_by_key(|e| e.timestamp);

    let mut count = 0;
    for (i, first) in activations.iter().enumerate() {
        if first.entity_id != chain[0] {
            continue;
        }
        let mut cursor = first.timestamp;
        let mut matched = true;
        for next_entity in &chain[1..] {
            let found = activations[i..]
                .iter()
                .find(|e| e.entity_id == *next_entity && e.timestamp >= cursor && e.timestamp - cursor <= window);
            match found {
                Some(event) => cursor = event.timestamp,
                None => {
                    matched = false;
                    break;
                }
            }
        }
        if matched {
            count += 1;
        }
    }
    count
}

/// Builds depth-3 and depth-4 chains from the co-occurrence edge graph.
/// Admissibility: every hop's edge weight exceeds `edge_floor`, and the
/// sequence is empirically observed at least `min_support_chain` times
/// within `W` (depth 3) or `3W` (depth 4). When two admissible chains share
/// an anchor, the one with the higher minimum edge weight wins; ties keep
/// the shorter chain (spec §4.4 item 3).
#[must_use]
pub fn build(patterns: &[Pattern], events: &[Event], config: &SynergyConfig) -> Vec<Synergy> {
    let graph = Graph::from_patterns(patterns);
    let window = patterns
        .iter()
        .find_map(|p| match &p.metadata {
            PatternMetadata::CoOccurrence { window_s, .. } => Some(*window_s),
            _ => None,
        })
        .unwrap_or(300);
    let window = chrono::Duration::seconds(window as i64);

    let mut candidates: Vec<(Vec<EntityId>, f64, usize)> = Vec::new();

    for ((a, b), w_ab) in &graph.edges {
        if *w_ab < config.edge_floor {
            continue;
        }
        for (c, w_bc) in graph.successors(b) {
            if w_bc < config.edge_floor || c == a {
                continue;
            }
            let chain3 = vec![a.clone(), b.clone(), c.clone()];
            let occurrences = sequence_occurrences(events, &chain3, window * 2);
            if occurrences >= config.min_support_chain {
                candidates.push((chain3.clone(), w_ab.min(w_bc), occurrences));
            }

            for (d, w_cd) in graph.successors(c) {
                if w_cd < config.edge_floor || d == a || d == b {
                    continue;
                }
                let chain4 = vec![a.clone(), b.clone(), c.clone(), d.clone()];
                let occurrences4 = sequence_occurrences(events, &chain4, window * 3);
                if occurrences4 >= config.min_support_chain {
                    candidates.push((chain4, w_ab.min(w_bc).min(w_cd), occurrences4));
                }
            }
        }
    }

    let winners = select_best_per_anchor(candidates);

    winners
        .into_iter()
        .filter_map(|(chain, min_weight, occurrences)| {
            let depth = chain.len();
            let complexity = if depth == 3 { Complexity::Medium } else { Complexity::High };
            Synergy::new(
                SynergyKind::DeviceChain,
                chain,
                min_weight.clamp(0.0, 1.0),
                min_weight.clamp(0.0, 1.0),
                complexity,
                (occurrences as f64 / (occurrences as f64 + 10.0)).clamp(0.0, 1.0),
                true,
                vec![],
            )
            .ok()
        })
        .collect()
}

/// When multiple chains share an anchor (first entity), keep only the one
/// with the highest minimum edge weight; ties keep the shorter chain.
fn select_best_per_anchor(
    candidates: Vec<(Vec<EntityId>, f64, usize)>,
) -> Vec<(Vec<EntityId>, f64, usize)> {
    let mut best: HashMap<EntityId, (Vec<EntityId>, f64, usize)> = HashMap::new();
    for (chain, weight, occurrences) in candidates {
        let anchor = chain[0].clone();
        match best.get(&anchor) {
            None => {
                best.insert(anchor, (chain, weight, occurrences));
            }
            Some((existing_chain, existing_weight, _)) => {
                let better = weight > *existing_weight
                    || ((weight - *existing_weight).abs() < f64::EPSILON
                        && chain.len() < existing_chain.len());
                if better {
                    best.insert(anchor, (chain, weight, occurrences));
                }
            }
        }
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn co_occurrence(anchor: &str, partner: &str, confidence: f64) -> Pattern {
        Pattern::new(
            EntityId::new(anchor).unwrap(),
            PatternMetadata::CoOccurrence {
                partner: EntityId::new(partner).unwrap(),
                window_s: 30,
                direction: Direction::AnchorTriggersPartner,
            },
            confidence,
            20,
            1,
            Utc::now(),
        )
        .unwrap()
    }

    fn event(entity: &str, second_offset: i64) -> Event {
        Event {
            timestamp: Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()
                + chrono::Duration::seconds(second_offset),
            event_type: "state_changed".to_string(),
            entity_id: EntityId::new(entity).unwrap(),
            new_state: "on".to_string(),
            device_id: None,
            area_id: None,
            attributes: Default::default(),
        }
    }

    #[test]
    fn three_hop_chain_with_enough_support_is_kept() {
        let patterns = vec![
            co_occurrence("a.motion", "b.light", 0.9),
            co_occurrence("b.light", "c.fan", 0.9),
        ];
        let mut events = Vec::new();
        for day in 0..5i64 {
            let base = day * 86_400;
            events.push(event("a.motion", base));
            events.push(event("b.light", base + 5));
            events.push(event("c.fan", base + 10));
        }
        let config = SynergyConfig::default();
        let synergies = build(&patterns, &events, &config);
        assert!(synergies.iter().any(|s| s.depth == 3));
    }

    #[test]
    fn insufficient_sequence_support_drops_the_chain() {
        let patterns = vec![
            co_occurrence("a.motion", "b.light", 0.9),
            co_occurrence("b.light", "c.fan", 0.9),
        ];
        let events = vec![event("a.motion", 0), event("b.light", 5), event("c.fan", 10)];
        let config = SynergyConfig::default();
        let synergies = build(&patterns, &events, &config);
        assert!(synergies.is_empty());
    }
}
