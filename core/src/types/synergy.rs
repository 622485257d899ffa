//! `Synergy` (spec §3) and its priority formula.

use super::ids::{EntityId, PatternId, SynergyId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynergyKind {
    DevicePair,
    DeviceChain,
    WeatherContext,
    EnergyContext,
    EventContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    /// `complexity_adjust` term of the priority formula (spec §3).
    #[must_use]
    pub fn priority_adjust(self) -> f64 {
        match self {
            Complexity::Low => 0.10,
            Complexity::Medium => 0.0,
            Complexity::High => -0.10,
        }
    }
}

/// A directed relationship between two or more devices that suggests an
/// automation opportunity (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synergy {
    pub id: SynergyId,
    pub kind: SynergyKind,
    pub depth: usize,
    pub chain: Vec<EntityId>,
    impact: f64,
    confidence: f64,
    pub complexity: Complexity,
    pattern_support: f64,
    pub validated_by_patterns: bool,
    pub supporting_pattern_ids: Vec<PatternId>,
}

impl Synergy {
    /// # Errors
    /// Returns `Error::InvalidInput` if `chain.len() != depth` (spec §3/§8
    /// property 3: chain integrity) or any score is outside `[0,1]`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: SynergyKind,
        chain: Vec<EntityId>,
        impact: f64,
        confidence: f64,
        complexity: Complexity,
        pattern_support: f64,
        validated_by_patterns: bool,
        supporting_pattern_ids: Vec<PatternId>,
    ) -> crate::Result<Self> {
        let depth = chain.len();
        if depth < 2 {
            return Err(crate::Error::InvalidInput(
                "synergy chain must have depth >= 2".to_string(),
            ));
        }
        for (label, value) in [
            ("impact", impact),
            ("confidence", confidence),
            ("pattern_support", pattern_support),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(crate::Error::InvalidInput(format!(
                    "synergy {label} must be in [0,1], got {value}"
                )));
            }
        }
        Ok(Self {
            id: SynergyId::new(),
            kind,
            depth,
            chain,
            impact,
            confidence,
            complexity,
            pattern_support,
            validated_by_patterns,
            supporting_pattern_ids,
        })
    }

    #[must_use]
    pub fn impact(&self) -> f64 {
        self.impact
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    #[must_use]
    pub fn pattern_support(&self) -> f64 {
        self.pattern_support
    }

    pub fn merge_confidence(&mut self, observed: f64, this_weight: f64) {
        self.confidence = (self.confidence * this_weight + observed * (1.0 - this_weight))
            .clamp(0.0, 1.0);
    }

    pub fn merge_impact_max(&mut self, observed: f64) {
        self.impact = self.impact.max(observed).clamp(0.0, 1.0);
    }

    /// Scales both `impact` and `confidence` down by `factor` (spec §4.4
    /// item 4: dissimilar-adjacency chains are demoted, never dropped).
    pub fn demote(&mut self, factor: f64) {
        self.impact = (self.impact * factor).clamp(0.0, 1.0);
        self.confidence = (self.confidence * factor).clamp(0.0, 1.0);
    }

    /// Raw priority per spec §3:
    /// `0.40*impact + 0.25*confidence + 0.25*pattern_support
    ///  + 0.10*(1 if validated else 0) + complexity_adjust`.
    /// Bounded in `[-0.10, 1.10]` before clamping on store (spec §8 property 2).
    #[must_use]
    pub fn raw_priority(&self, weights: &PriorityWeights) -> f64 {
        weights.impact * self.impact
            + weights.confidence * self.confidence
            + weights.pattern_support * self.pattern_support
            + weights.validated_bonus * f64::from(self.validated_by_patterns)
            + self.complexity.priority_adjust()
    }

    /// Priority clamped to `[0,1]` for storage.
    #[must_use]
    pub fn priority(&self, weights: &PriorityWeights) -> f64 {
        self.raw_priority(weights).clamp(0.0, 1.0)
    }

    /// `(kind, ordered chain)` uniqueness key used by duplicate-merge-on-insert (spec §4.4).
    #[must_use]
    pub fn identity_key(&self) -> String {
        let chain = self
            .chain
            .iter()
            .map(EntityId::as_str)
            .collect::<Vec<_>>()
            .join(">");
        format!("{:?}:{}", self.kind, chain)
    }
}

/// Priority weights, made configurable per spec §9 Open Question 2 (other
/// passages weight confidence equal to impact); see `DESIGN.md`.
#[derive(Debug, Clone, Copy)]
pub struct PriorityWeights {
    pub impact: f64,
    pub confidence: f64,
    pub pattern_support: f64,
    pub validated_bonus: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            impact: 0.40,
            confidence: 0.25,
            pattern_support: 0.25,
            validated_bonus: 0.10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> Vec<EntityId> {
        (0..n)
            .map(|i| EntityId::new(format!("light.device_{i}")).unwrap())
            .collect()
    }

    #[test]
    fn rejects_chain_shorter_than_depth_two() {
        let result = Synergy::new(
            SynergyKind::DeviceChain,
            chain(1),
            0.5,
            0.5,
            Complexity::Medium,
            0.5,
            false,
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn priority_matches_formula() {
        let synergy = Synergy::new(
            SynergyKind::DevicePair,
            chain(2),
            0.8,
            0.9,
            Complexity::Low,
            0.6,
            true,
            vec![],
        )
        .unwrap();
        let weights = PriorityWeights::default();
        let expected = 0.40 * 0.8 + 0.25 * 0.9 + 0.25 * 0.6 + 0.10 * 1.0 + 0.10;
        assert!((synergy.raw_priority(&weights) - expected).abs() < 1e-9);
        assert!(synergy.priority(&weights) <= 1.0);
    }

    #[test]
    fn priority_is_clamped_to_unit_interval_for_storage() {
        let synergy = Synergy::new(
            SynergyKind::DevicePair,
            chain(2),
            1.0,
            1.0,
            Complexity::Low,
            1.0,
            true,
            vec![],
        )
        .unwrap();
        let weights = PriorityWeights::default();
        assert!(synergy.raw_priority(&weights) > 1.0);
        assert_eq!(synergy.priority(&weights), 1.0);
    }
}
