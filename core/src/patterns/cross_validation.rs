//! Cross-validation pruning pass (spec §4.3): drop a candidate that is a
//! strict sub-explanation of another kept candidate for the same anchor —
//! same kind, a metadata key that is a prefix of the other's, and a lower
//! confidence. The canonical example is a `TimeOfDay` candidate whose
//! weekday mask is a strict subset of another candidate's mask at the same
//! hour: the narrower pattern adds no information once the broader one is
//! kept.

use super::PatternCandidate;
use crate::types::PatternMetadata;

/// Removes candidates that are strictly subsumed by another, higher- or
/// equal-confidence candidate with the same anchor and kind.
#[must_use]
pub fn prune(candidates: Vec<PatternCandidate>) -> Vec<PatternCandidate> {
    let mut kept: Vec<PatternCandidate> = Vec::with_capacity(candidates.len());

    'candidate: for candidate in candidates {
        for other in &kept {
            if is_subsumed(&candidate, other) {
                continue 'candidate;
            }
        }
        kept.retain(|existing| !is_subsumed(existing, &candidate));
        kept.push(candidate);
    }

    kept
}

/// `a` is subsumed by `b` when they share an anchor and kind, `a`'s weekday
/// mask is a strict subset of `b`'s at the same hour, and `a`'s confidence
/// does not exceed `b`'s — a narrower observation the broader one already
/// explains.
fn is_subsumed(a: &PatternCandidate, b: &PatternCandidate) -> bool {
    if a.anchor != b.anchor || a == b {
        return false;
    }

    match (&a.metadata, &b.metadata) {
        (
            PatternMetadata::TimeOfDay {
                hour: hour_a,
                weekday_mask: mask_a,
            },
            PatternMetadata::TimeOfDay {
                hour: hour_b,
                weekday_mask: mask_b,
            },
        ) => {
            hour_a == hour_b
                && mask_a.0 != mask_b.0
                && mask_a.0 & mask_b.0 == mask_a.0
                && a.confidence <= b.confidence
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityId, WeekdayMask};

    fn candidate(mask: u8, confidence: f64) -> PatternCandidate {
        PatternCandidate {
            anchor: EntityId::new("light.office").unwrap(),
            metadata: PatternMetadata::TimeOfDay {
                hour: 7,
                weekday_mask: WeekdayMask(mask),
            },
            confidence,
            occurrences: 10,
        }
    }

    #[test]
    fn narrower_weekday_mask_is_pruned_in_favor_of_broader() {
        let broad = candidate(WeekdayMask::WEEKDAYS, 0.9);
        let narrow = candidate(WeekdayMask::MON, 0.85);

        let kept = prune(vec![narrow, broad.clone()]);
        assert_eq!(kept, vec![broad]);
    }

    #[test]
    fn unrelated_candidates_are_both_kept() {
        let a = candidate(WeekdayMask::MON, 0.9);
        let mut b = candidate(WeekdayMask::SAT, 0.9);
        b.metadata = PatternMetadata::TimeOfDay {
            hour: 20,
            weekday_mask: WeekdayMask(WeekdayMask::SAT),
        };

        let kept = prune(vec![a.clone(), b.clone()]);
        assert_eq!(kept.len(), 2);
    }
}
