//! Layer 4: similarity augmentation (spec §4.4 item 4). Demotes — never
//! drops — chains whose adjacent devices are dissimilar, unless pattern
//! support is already strong.

use crate::config::SynergyConfig;
use crate::types::{Event, EntityId, Synergy};
use crate::math::similarity::cosine_similarity;
use std::collections::HashMap;

/// A device is below the embedding floor AND weakly supported demote
/// factor; strongly-supported chains are left untouched even if the
/// adjacent devices look dissimilar (spec: "unless pattern support is
/// strong").
const DEMOTION_FACTOR: f64 = 0.70;
const STRONG_SUPPORT_FLOOR: f64 = 0.60;

/// One fixed-length device embedding built from (domain, area, recent
/// activation rate) — a cheap stand-in for a learned embedding, sufficient
/// for the adjacency-similarity check this layer performs.
fn device_embedding(entity: &EntityId, events: &[Event]) -> Vec<f32> {
    let domain_hash = (hash_str(entity.domain()) % 997) as f32 / 997.0;
    let area = events
        .iter()
        .find(|e| &e.entity_id == entity)
        .and_then(|e| e.area_id.as_deref())
        .unwrap_or("");
    let area_hash = (hash_str(area) % 997) as f32 / 997.0;
    let activity = events.iter().filter(|e| &e.entity_id == entity && e.is_activation()).count() as f32;
    let activity_norm = (activity / (activity + 10.0)).min(1.0);

    vec![domain_hash, area_hash, activity_norm]
}

fn hash_str(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Demotes chains (depth >= 2) whose average adjacent-device cosine
/// similarity falls below `embedding_similarity_floor`, unless
/// `pattern_support` already clears [`STRONG_SUPPORT_FLOOR`].
pub fn apply(synergies: &mut [Synergy], events: &[Event], config: &SynergyConfig) {
    let mut cache: HashMap<EntityId, Vec<f32>> = HashMap::new();
    let mut embedding_of = |entity: &EntityId| -> Vec<f32> {
        cache
            .entry(entity.clone())
            .or_insert_with(|| device_embedding(entity, events))
            .clone()
    };

    for synergy in synergies.iter_mut() {
        if synergy.chain.len() < 2 || synergy.pattern_support() >= STRONG_SUPPORT_FLOOR {
            continue;
        }

        let pairs: Vec<f64> = synergy
            .chain
            .windows(2)
            .map(|pair| {
                let a = embedding_of(&pair[0]);
                let b = embedding_of(&pair[1]);
                cosine_similarity(&a, &b)
            })
            .collect();
        let average = pairs.iter().sum::<f64>() / pairs.len() as f64;

        if average < config.embedding_similarity_floor {
            synergy.demote(DEMOTION_FACTOR);
        }
    }
}
