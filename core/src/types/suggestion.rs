//! `Suggestion` (spec §3) and the language-neutral `StructuredPlan` returned
//! by the LLM adapter's `plan` role (spec §6).

use super::ids::{EntityId, SuggestionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Draft,
    Refining,
    Approved,
    Rejected,
    Deployed,
    Superseded,
}

impl SuggestionStatus {
    /// Whether an automation artefact must be present for this status
    /// (spec §3 invariant, §8 property 4).
    #[must_use]
    pub fn requires_artefact(self) -> bool {
        matches!(
            self,
            SuggestionStatus::Approved | SuggestionStatus::Deployed | SuggestionStatus::Superseded
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Pattern,
    Feature,
    Synergy,
    AskAi,
}

/// A single turn in the suggestion's append-only conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub at: DateTime<Utc>,
    pub user_text: String,
    pub resulting_description: String,
}

/// A trigger/condition/action in a `StructuredPlan`. Deliberately untyped
/// beyond `kind` + `params`: the core is platform-agnostic (spec §6) and the
/// out-of-scope deployment adapter interprets these against a concrete home-
/// automation platform's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub kind: String,
    pub params: HashMap<String, Value>,
}

/// A language-neutral, typed automation plan: not a platform artefact
/// (spec §6). The out-of-scope deployment adapter renders this into the
/// target platform's configuration format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StructuredPlan {
    pub triggers: Vec<PlanStep>,
    pub conditions: Vec<PlanStep>,
    pub actions: Vec<PlanStep>,
}

/// A user-facing automation proposal (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    status: SuggestionStatus,
    pub source: SuggestionSource,
    pub description: String,
    pub plan: Option<StructuredPlan>,
    pub devices_involved: Vec<EntityId>,
    pub confidence: f64,
    /// Whether the description came from the LLM adapter or the
    /// deterministic fallback template (spec §4.6 failure semantics).
    pub description_source: DescriptionSource,
    /// Set only on approval, by the external deployment adapter's returned id (spec §6).
    pub artefact_id: Option<String>,
    pub refinement_count: u32,
    pub conversation_history: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
    pub yaml_generated_at: Option<DateTime<Utc>>,
    pub supersedes: Option<SuggestionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionSource {
    Llm,
    Template,
}

impl Suggestion {
    #[must_use]
    pub fn draft(
        source: SuggestionSource,
        description: String,
        description_source: DescriptionSource,
        devices_involved: Vec<EntityId>,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SuggestionId::new(),
            status: SuggestionStatus::Draft,
            source,
            description,
            plan: None,
            devices_involved,
            confidence: confidence.clamp(0.0, 1.0),
            description_source,
            artefact_id: None,
            refinement_count: 0,
            conversation_history: Vec::new(),
            created_at: now,
            yaml_generated_at: None,
            supersedes: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> SuggestionStatus {
        self.status
    }

    /// `suggestions.refine` (spec §6, §4.8): append to history and bump the counter.
    pub fn refine(&mut self, user_text: String, new_description: String, now: DateTime<Utc>) {
        self.conversation_history.push(ConversationTurn {
            at: now,
            user_text,
            resulting_description: new_description.clone(),
        });
        self.description = new_description;
        self.refinement_count += 1;
        self.status = SuggestionStatus::Refining;
    }

    /// `suggestions.approve` (spec §6): transitions to `approved`. The
    /// artefact itself is attached separately once the deployment adapter
    /// responds, via `attach_artefact`.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` if the suggestion is not `draft` or `refining`.
    pub fn approve(&mut self) -> crate::Result<()> {
        if !matches!(
            self.status,
            SuggestionStatus::Draft | SuggestionStatus::Refining
        ) {
            return Err(crate::Error::InvalidState(format!(
                "cannot approve suggestion in status {:?}",
                self.status
            )));
        }
        self.status = SuggestionStatus::Approved;
        Ok(())
    }

    pub fn reject(&mut self, _reason: Option<String>) {
        self.status = SuggestionStatus::Rejected;
    }

    /// Called once the out-of-scope deployment adapter returns an `artefact_id`.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` if not currently `approved`.
    pub fn attach_artefact(&mut self, artefact_id: String, now: DateTime<Utc>) -> crate::Result<()> {
        if self.status != SuggestionStatus::Approved {
            return Err(crate::Error::InvalidState(
                "artefact can only be attached to an approved suggestion".to_string(),
            ));
        }
        self.artefact_id = Some(artefact_id);
        self.yaml_generated_at = Some(now);
        self.status = SuggestionStatus::Deployed;
        Ok(())
    }

    pub fn supersede(&mut self, by: SuggestionId) {
        self.status = SuggestionStatus::Superseded;
        self.supersedes = Some(by);
    }

    /// Spec §3 invariant / §8 property 4.
    #[must_use]
    pub fn artefact_invariant_holds(&self) -> bool {
        self.artefact_id.is_some() == self.status.requires_artefact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Suggestion {
        Suggestion::draft(
            SuggestionSource::Pattern,
            "turn on the office light at 7am".to_string(),
            DescriptionSource::Template,
            vec![EntityId::new("light.office").unwrap()],
            0.9,
            Utc::now(),
        )
    }

    #[test]
    fn draft_has_no_artefact() {
        let s = draft();
        assert!(s.artefact_invariant_holds());
        assert!(s.artefact_id.is_none());
    }

    #[test]
    fn full_lifecycle_matches_scenario_s5() {
        let mut s = draft();
        s.refine(
            "change 7 AM to 6:30 AM".to_string(),
            "turn on the office light at 6:30am".to_string(),
            Utc::now(),
        );
        assert_eq!(s.refinement_count, 1);
        assert_eq!(s.status(), SuggestionStatus::Refining);

        s.approve().unwrap();
        assert_eq!(s.status(), SuggestionStatus::Approved);
        assert!(s.artefact_invariant_holds());

        s.attach_artefact("A-123".to_string(), Utc::now()).unwrap();
        assert_eq!(s.status(), SuggestionStatus::Deployed);
        assert_eq!(s.artefact_id.as_deref(), Some("A-123"));
        assert!(s.yaml_generated_at.is_some());
        assert!(s.supersedes.is_none());
        assert!(s.artefact_invariant_holds());
    }

    #[test]
    fn cannot_attach_artefact_before_approval() {
        let mut s = draft();
        assert!(s.attach_artefact("A-1".to_string(), Utc::now()).is_err());
    }

    #[test]
    fn cannot_approve_a_rejected_suggestion() {
        let mut s = draft();
        s.reject(None);
        assert!(s.approve().is_err());
    }
}
