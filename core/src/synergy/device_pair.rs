//! Layer 1: depth-2 device-pair synergies (spec §4.4 item 1).

use crate::config::SynergyConfig;
use crate::types::{Complexity, Direction, Pattern, PatternMetadata, Synergy, SynergyKind};
use std::collections::HashMap;

/// Saturating support curve: more observed occurrences raise `pattern_support`
/// toward 1.0 without ever reaching it, so a single borderline observation
/// never outweighs impact/confidence in the priority formula.
fn support_from_occurrences(occurrences: usize) -> f64 {
    let n = occurrences as f64;
    n / (n + 10.0)
}

/// For every co-occurrence pattern at or above `synergy_floor`, emit a
/// depth-2 synergy with `impact = frequency * distinctness`, where
/// `distinctness` penalizes an anchor that co-occurs with many distinct
/// partners (a "hub" device whose pairing with any one partner is less
/// informative).
#[must_use]
pub fn build(patterns: &[Pattern], config: &SynergyConfig) -> Vec<Synergy> {
    let qualifying: Vec<&Pattern> = patterns
        .iter()
        .filter(|p| {
            matches!(p.metadata, PatternMetadata::CoOccurrence { .. })
                && p.confidence() >= config.synergy_floor
        })
        .collect();

    let mut partner_counts: HashMap<&crate::types::EntityId, usize> = HashMap::new();
    for pattern in &qualifying {
        *partner_counts.entry(&pattern.anchor).or_default() += 1;
    }

    let mut synergies = Vec::new();
    for pattern in &qualifying {
        let PatternMetadata::CoOccurrence { partner, direction, .. } = &pattern.metadata else {
            unreachable!("filtered to CoOccurrence above");
        };

        let distinct_partners = *partner_counts.get(&pattern.anchor).unwrap_or(&1) as f64;
        let distinctness = 1.0 / distinct_partners;
        let frequency = pattern.confidence();
        let impact = (frequency * distinctness).clamp(0.0, 1.0);

        let chain = match direction {
            Direction::AnchorTriggersPartner => vec![pattern.anchor.clone(), partner.clone()],
            Direction::PartnerTriggersAnchor => vec![partner.clone(), pattern.anchor.clone()],
        };

        let synergy = Synergy::new(
            SynergyKind::DevicePair,
            chain,
            impact,
            frequency,
            Complexity::Low,
            support_from_occurrences(pattern.occurrences),
            true,
            vec![pattern.id],
        );
        if let Ok(synergy) = synergy {
            synergies.push(synergy);
        }
    }

    synergies
}
