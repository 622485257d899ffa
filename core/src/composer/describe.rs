//! Description generation with template fallback (spec §4.6, last paragraph).

use super::pipeline::RankedCandidate;
use super::scoring::CandidateSource;
use crate::adapters::llm::DescribeRequest;
use crate::adapters::DescriptionGenerator;
use crate::config::CreativityLevel;
use crate::types::{
    DescriptionSource, PatternMetadata, Suggestion, SuggestionSource, SynergyKind,
};
use chrono::{DateTime, Utc};

fn pattern_summary(metadata: &PatternMetadata) -> String {
    match metadata {
        PatternMetadata::TimeOfDay { hour, weekday_mask } => {
            format!("activates around {hour}:00 on weekday mask {weekday_mask}")
        }
        PatternMetadata::CoOccurrence { partner, window_s, .. } => {
            format!("tends to be followed by {partner} within {window_s}s")
        }
        PatternMetadata::Anomaly { signature } => format!("shows a repeated override ({signature})"),
    }
}

fn synergy_summary(kind: SynergyKind, chain_len: usize) -> String {
    format!("{kind:?} synergy across {chain_len} devices")
}

/// Deterministic fallback used when the LLM adapter fails or is absent
/// (spec: "the composer falls back to a deterministic template description
/// and flags the row `description_source = template`").
fn template_description(candidate: &RankedCandidate) -> String {
    match &candidate.source {
        CandidateSource::Pattern(p) => format!(
            "Automate {}: it {}.",
            p.anchor,
            pattern_summary(&p.metadata)
        ),
        CandidateSource::Synergy(s) => format!(
            "Consider linking {} ({}).",
            s.chain
                .iter()
                .map(|e| e.as_str())
                .collect::<Vec<_>>()
                .join(" -> "),
            synergy_summary(s.kind, s.chain.len())
        ),
        CandidateSource::Feature(f) => format!(
            "{} supports \"{}\" but it has not been used recently; consider an automation for it.",
            f.device_id, f.capability_name
        ),
    }
}

fn source_kind(source: &CandidateSource) -> SuggestionSource {
    match source {
        CandidateSource::Pattern(_) => SuggestionSource::Pattern,
        CandidateSource::Synergy(_) => SuggestionSource::Synergy,
        CandidateSource::Feature(_) => SuggestionSource::Feature,
    }
}

fn describe_request(candidate: &RankedCandidate, creativity: CreativityLevel) -> DescribeRequest {
    match &candidate.source {
        CandidateSource::Pattern(p) => DescribeRequest {
            pattern_summary: pattern_summary(&p.metadata),
            synergy_summary: None,
            creativity,
        },
        CandidateSource::Synergy(s) => DescribeRequest {
            pattern_summary: String::new(),
            synergy_summary: Some(synergy_summary(s.kind, s.chain.len())),
            creativity,
        },
        CandidateSource::Feature(f) => DescribeRequest {
            pattern_summary: format!("underutilized capability {}", f.capability_name),
            synergy_summary: None,
            creativity,
        },
    }
}

/// Calls the LLM adapter for a freeform description; on any adapter
/// failure (transient or not — the composer never blocks a whole run on
/// one adapter call) falls back to [`template_description`] and marks
/// `description_source = template`.
pub async fn compose_description(
    candidate: RankedCandidate,
    generator: &dyn DescriptionGenerator,
    creativity: CreativityLevel,
    now: DateTime<Utc>,
) -> Suggestion {
    let request = describe_request(&candidate, creativity);
    let (description, description_source) = match generator.describe(&request).await {
        Ok(description) => (description, DescriptionSource::Llm),
        Err(_) => (template_description(&candidate), DescriptionSource::Template),
    };

    Suggestion::draft(
        source_kind(&candidate.source),
        description,
        description_source,
        candidate.devices_involved,
        candidate.confidence,
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Complexity, EntityId, SynergyKind as Kind};
    use crate::Result;
    use async_trait::async_trait;

    struct AlwaysFails;

    #[async_trait]
    impl DescriptionGenerator for AlwaysFails {
        async fn describe(&self, _request: &DescribeRequest) -> Result<String> {
            Err(crate::Error::AdapterNonTransient("down".to_string()))
        }
        async fn plan(
            &self,
            _request: &crate::adapters::llm::PlanRequest,
        ) -> Result<crate::types::StructuredPlan> {
            unimplemented!("not exercised by this test")
        }
    }

    #[tokio::test]
    async fn adapter_failure_falls_back_to_template() {
        let synergy = crate::types::Synergy::new(
            Kind::DevicePair,
            vec![EntityId::new("a").unwrap(), EntityId::new("b").unwrap()],
            0.8,
            0.8,
            Complexity::Low,
            0.8,
            true,
            vec![],
        )
        .unwrap();
        let candidate = RankedCandidate {
            devices_involved: synergy.chain.clone(),
            confidence: synergy.confidence(),
            score: 0.8,
            source: CandidateSource::Synergy(synergy),
        };

        let suggestion =
            compose_description(candidate, &AlwaysFails, CreativityLevel::Balanced, Utc::now()).await;
        assert_eq!(suggestion.description_source, DescriptionSource::Template);
        assert!(suggestion.description.contains("Consider linking"));
    }
}
