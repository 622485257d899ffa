//! Upsert-with-merge semantics for patterns and synergies (spec §4.2,
//! §4.4), implemented once against [`super::StorageBackend`]'s CRUD
//! primitives so every concrete backend (and the in-memory test backend)
//! gets identical merge/trend/idempotence behavior (spec §8 property 7).

use super::StorageBackend;
use crate::math::{linear_regression_slope, trend_from_slope};
use crate::types::{EntityId, Pattern, PatternId, PatternMetadata, PatternSnapshot, Synergy};
use crate::Result;
use chrono::{DateTime, Utc};

/// Number of most-recent snapshots used to recompute a pattern's cached
/// trend on every re-observation (spec §4.2).
const TREND_WINDOW: usize = 8;

/// Insert a freshly detected pattern, or merge it into an existing row with
/// the same identity key. Returns `(id, true)` on first insertion and
/// `(id, false)` on merge.
///
/// Merge rule: confidence becomes the running mean over
/// `confidence_history_count + 1` observations, occurrences accumulate,
/// `last_seen` advances, and trend is recomputed from the last
/// [`TREND_WINDOW`] snapshots (spec §4.2).
pub async fn upsert_pattern(
    storage: &dyn StorageBackend,
    anchor: EntityId,
    metadata: PatternMetadata,
    observed_confidence: f64,
    observed_occurrences: usize,
    min_support: usize,
    now: DateTime<Utc>,
) -> Result<(PatternId, bool)> {
    let identity_key = format!(
        "{}:{}:{}",
        metadata.kind(),
        anchor,
        metadata.canonical_key()
    );

    match storage.find_pattern_by_identity(&identity_key).await? {
        None => {
            let pattern = Pattern::new(
                anchor,
                metadata,
                observed_confidence,
                observed_occurrences,
                min_support,
                now,
            )?;
            let id = pattern.id;
            storage.insert_pattern(&pattern).await?;
            storage
                .append_pattern_snapshot(&PatternSnapshot {
                    pattern_id: id,
                    observed_confidence,
                    observed_occurrences,
                    recorded_at: now,
                })
                .await?;
            Ok((id, true))
        }
        Some(mut pattern) => {
            let id = pattern.id;
            let history_count = pattern.confidence_history_count as f64;
            let merged_confidence = (pattern.confidence() * history_count + observed_confidence)
                / (history_count + 1.0);
            pattern.set_confidence(merged_confidence);
            pattern.occurrences += observed_occurrences;
            pattern.confidence_history_count += 1;
            pattern.last_seen = now;

            storage
                .append_pattern_snapshot(&PatternSnapshot {
                    pattern_id: id,
                    observed_confidence,
                    observed_occurrences,
                    recorded_at: now,
                })
                .await?;

            let snapshots = storage.list_pattern_snapshots(id, TREND_WINDOW).await?;
            let values: Vec<f64> = snapshots
                .iter()
                .rev()
                .map(|s| s.observed_confidence)
                .collect();
            let slope = linear_regression_slope(&values);
            let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
            let (trend, strength) = trend_from_slope(slope, mean);
            pattern.trend = trend;
            pattern.trend_strength = strength;

            storage.replace_pattern(&pattern).await?;
            Ok((id, false))
        }
    }
}

/// Insert a freshly detected synergy, or merge it into an existing row with
/// the same identity key (spec §4.4): confidence blends toward the new
/// observation, impact takes the max, and supporting pattern ids accumulate.
///
/// `merge_weight` is how much the existing confidence counts for versus the
/// new observation (e.g. `0.7` keeps the synergy stable against one-off
/// detector noise). Returns `(id, true)` on first insertion.
pub async fn upsert_synergy(
    storage: &dyn StorageBackend,
    mut candidate: Synergy,
    merge_weight: f64,
) -> Result<(crate::types::SynergyId, bool)> {
    let identity_key = candidate.identity_key();

    match storage.find_synergy_by_identity(&identity_key).await? {
        None => {
            let id = candidate.id;
            storage.insert_synergy(&candidate).await?;
            Ok((id, true))
        }
        Some(mut existing) => {
            let id = existing.id;
            existing.merge_confidence(candidate.confidence(), merge_weight);
            existing.merge_impact_max(candidate.impact());
            existing.validated_by_patterns |= candidate.validated_by_patterns;
            for pattern_id in candidate.supporting_pattern_ids.drain(..) {
                if !existing.supporting_pattern_ids.contains(&pattern_id) {
                    existing.supporting_pattern_ids.push(pattern_id);
                }
            }
            storage.replace_synergy(&existing).await?;
            Ok((id, false))
        }
    }
}
