//! Layered configuration for the analysis pipeline (spec §4.13).
//!
//! `AnalysisConfig` holds every tunable threshold named in spec §4; a run
//! snapshots it at start so no process-wide mutable configuration can change
//! mid-run (§5).

use std::time::Duration;

/// Thresholds and window sizes for the time-of-day and co-occurrence
/// detectors (§4.3).
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Minimum occurrences before a bin/pair/signature becomes a candidate pattern.
    pub min_support: usize,
    /// Minimum bin frequency / `P(B|A)` for a candidate to become a pattern.
    pub confidence_floor: f64,
    /// Co-occurrence sliding window, default 300s.
    pub co_occurrence_window: Duration,
    /// "Repeated override" signature window for the anomaly detector, default 120s.
    pub anomaly_override_window: Duration,
    /// Isolation-forest contamination parameter.
    pub anomaly_contamination: f64,
    /// Number of `PatternSnapshot`s used to recompute the cached trend slope.
    pub trend_snapshot_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_support: 5,
            confidence_floor: 0.20,
            co_occurrence_window: Duration::from_secs(300),
            anomaly_override_window: Duration::from_secs(120),
            anomaly_contamination: 0.10,
            trend_snapshot_window: 8,
        }
    }
}

/// Thresholds for the synergy engine (§4.4).
#[derive(Debug, Clone, Copy)]
pub struct SynergyConfig {
    /// Minimum co-occurrence confidence to emit a depth-2 device-pair synergy.
    pub synergy_floor: f64,
    /// Minimum edge weight `P(B|A within W)` for a multi-hop chain edge.
    pub edge_floor: f64,
    /// Minimum observed-sequence occurrences for a depth-3/4 chain.
    pub min_support_chain: usize,
    /// Significance level for context-synergy chi-square tests.
    pub context_p_value: f64,
    /// Minimum effect size for context synergies to be considered material.
    pub context_effect_floor: f64,
    /// Cosine-similarity floor below which a chain is demoted (not dropped).
    pub embedding_similarity_floor: f64,
}

impl Default for SynergyConfig {
    fn default() -> Self {
        Self {
            synergy_floor: 0.70,
            edge_floor: 0.50,
            min_support_chain: 3,
            context_p_value: 0.01,
            context_effect_floor: 0.20,
            embedding_similarity_floor: 0.30,
        }
    }
}

/// Thresholds for the capability/feature analyzer (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct FeatureAnalysisConfig {
    /// Minimum times a device must be observed active for underutilization to be flagged.
    pub device_min_activity: usize,
}

impl Default for FeatureAnalysisConfig {
    fn default() -> Self {
        Self {
            device_min_activity: 10,
        }
    }
}

/// Creativity-level confidence floors and blueprint-preference multipliers (§4.6).
#[derive(Debug, Clone, Copy)]
pub struct ComposerConfig {
    pub creativity_floor_conservative: f64,
    pub creativity_floor_balanced: f64,
    pub creativity_floor_creative: f64,
    pub blueprint_multiplier_low: f64,
    pub blueprint_multiplier_medium: f64,
    pub blueprint_multiplier_high: f64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            creativity_floor_conservative: 0.85,
            creativity_floor_balanced: 0.70,
            creativity_floor_creative: 0.60,
            blueprint_multiplier_low: 0.5,
            blueprint_multiplier_medium: 1.0,
            blueprint_multiplier_high: 1.5,
        }
    }
}

/// Entity resolver fusion weights and accept/ambiguous cutoffs (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub weight_semantic: f64,
    pub weight_exact: f64,
    pub weight_fuzzy: f64,
    pub weight_numbered_suffix: f64,
    pub weight_area_prior: f64,
    pub accept_score_floor: f64,
    pub accept_margin_floor: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            weight_semantic: 0.35,
            weight_exact: 0.30,
            weight_fuzzy: 0.15,
            weight_numbered_suffix: 0.15,
            weight_area_prior: 0.05,
            accept_score_floor: 0.80,
            accept_margin_floor: 0.10,
        }
    }
}

/// Ask-AI session bounds (§4.8).
#[derive(Debug, Clone, Copy)]
pub struct AskAiConfig {
    /// Maximum clarifying questions per session.
    pub max_clarifications: u32,
    /// Retrieval-cache cosine threshold to skip clarification (default, per-user overridable).
    pub cache_skip_cosine: f64,
}

impl Default for AskAiConfig {
    fn default() -> Self {
        Self {
            max_clarifications: 3,
            cache_skip_cosine: 0.85,
        }
    }
}

/// Per-phase soft ceilings and abort multiplier (§5).
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimeoutConfig {
    pub fetch: Duration,
    pub detectors: Duration,
    pub synergies: Duration,
    pub features: Duration,
    pub compose: Duration,
    /// A phase exceeding `ceiling * abort_multiplier` is aborted.
    pub abort_multiplier: u32,
}

impl Default for PhaseTimeoutConfig {
    fn default() -> Self {
        Self {
            fetch: Duration::from_secs(120),
            detectors: Duration::from_secs(180),
            synergies: Duration::from_secs(120),
            features: Duration::from_secs(60),
            compose: Duration::from_secs(90),
            abort_multiplier: 3,
        }
    }
}

/// Top-level analysis configuration, snapshotted into each `AnalysisRun` at
/// start so no process-wide mutable configuration can change mid-run (§5).
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisConfig {
    pub detector: DetectorConfig,
    pub synergy: SynergyConfig,
    pub feature: FeatureAnalysisConfig,
    pub composer: ComposerConfig,
    pub resolver: ResolverConfig,
    pub ask_ai: AskAiConfig,
    pub timeouts: PhaseTimeoutConfig,
}

impl AnalysisConfig {
    /// Build a config from defaults overridden by `HOMEIQ_*` environment
    /// variables, same shape as the teacher's `MemoryConfig::from_env`:
    /// invalid values are logged and the default is kept.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("HOMEIQ_MIN_SUPPORT") {
            match value.parse::<usize>() {
                Ok(v) => config.detector.min_support = v,
                Err(_) => tracing::warn!(value, "invalid HOMEIQ_MIN_SUPPORT, keeping default"),
            }
        }

        if let Ok(value) = std::env::var("HOMEIQ_CONFIDENCE_FLOOR") {
            match value.parse::<f64>() {
                Ok(v) => config.detector.confidence_floor = v.clamp(0.0, 1.0),
                Err(_) => {
                    tracing::warn!(value, "invalid HOMEIQ_CONFIDENCE_FLOOR, keeping default");
                }
            }
        }

        if let Ok(value) = std::env::var("HOMEIQ_SYNERGY_FLOOR") {
            match value.parse::<f64>() {
                Ok(v) => config.synergy.synergy_floor = v.clamp(0.0, 1.0),
                Err(_) => tracing::warn!(value, "invalid HOMEIQ_SYNERGY_FLOOR, keeping default"),
            }
        }

        if let Ok(value) = std::env::var("HOMEIQ_CACHE_SKIP_COSINE") {
            match value.parse::<f64>() {
                Ok(v) => config.ask_ai.cache_skip_cosine = v.clamp(0.0, 1.0),
                Err(_) => {
                    tracing::warn!(value, "invalid HOMEIQ_CACHE_SKIP_COSINE, keeping default");
                }
            }
        }

        config
    }
}

/// Per-user preferences, validated at the `preferences.set` boundary (§6) and
/// stored in C2 rather than folded into the process-wide `AnalysisConfig`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserPreferences {
    pub max_suggestions: usize,
    pub creativity_level: CreativityLevel,
    pub blueprint_preference: BlueprintPreference,
    /// Overrides `AskAiConfig::cache_skip_cosine` for this user, if set.
    pub cache_skip_cosine_override: Option<f64>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            max_suggestions: 10,
            creativity_level: CreativityLevel::Balanced,
            blueprint_preference: BlueprintPreference::Medium,
            cache_skip_cosine_override: None,
        }
    }
}

impl UserPreferences {
    /// # Errors
    /// Returns `Error::InvalidInput` if `max_suggestions` is outside `[5,50]`
    /// (spec invariant, §8 property 5).
    pub fn validated(self) -> crate::Result<Self> {
        if !(5..=50).contains(&self.max_suggestions) {
            return Err(crate::Error::InvalidInput(format!(
                "max_suggestions must be in [5,50], got {}",
                self.max_suggestions
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativityLevel {
    Conservative,
    Balanced,
    Creative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintPreference {
    Low,
    Medium,
    High,
}
