//! Persisted state for an in-flight Ask-AI query (C8 §4.8 state machine), so
//! a clarification round trip survives a process restart between turns.

use crate::types::{EntityId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `RECEIVED → NORMALIZED → ENTITIES_EXTRACTED → CACHE_CHECKED → (CLARIFYING
/// ↕ user) → SUGGESTION_DRAFTED → RESPONDED`, with `ABORTED { reason }` as
/// the failure terminal (spec §4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AskAiState {
    Received,
    Normalized,
    EntitiesExtracted,
    CacheChecked,
    Clarifying,
    SuggestionDrafted,
    Responded,
    Aborted { reason: String },
}

impl AskAiState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Responded | Self::Aborted { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskAiSession {
    pub id: SessionId,
    pub user_id: String,
    pub raw_query: String,
    pub normalized_query: Option<String>,
    pub state: AskAiState,
    /// Entities resolved so far, updated as clarification rounds complete.
    pub resolved_entities: Vec<EntityId>,
    /// Clarifying questions already asked this session (spec §4.8 bounds
    /// this to `AskAiConfig::max_clarifications`, default 3).
    pub clarification_rounds: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AskAiSession {
    #[must_use]
    pub fn new(
        id: SessionId,
        user_id: impl Into<String>,
        raw_query: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            raw_query: raw_query.into(),
            normalized_query: None,
            state: AskAiState::Received,
            resolved_entities: Vec::new(),
            clarification_rounds: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, state: AskAiState, now: DateTime<Utc>) {
        self.state = state;
        self.updated_at = now;
    }

    /// # Errors
    /// Returns `Error::InvalidState` once the clarification budget is
    /// exhausted; callers should abort the session instead (spec §4.8).
    pub fn begin_clarification_round(&mut self, max_clarifications: u32, now: DateTime<Utc>) -> crate::Result<()> {
        if self.clarification_rounds >= max_clarifications {
            return Err(crate::Error::InvalidState(format!(
                "clarification limit {max_clarifications} exceeded"
            )));
        }
        self.clarification_rounds += 1;
        self.transition(AskAiState::Clarifying, now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionId;

    #[test]
    fn new_session_starts_received() {
        let now = Utc::now();
        let session = AskAiSession::new(SessionId::new(), "user-1", "turn off the lights", now);
        assert_eq!(session.state, AskAiState::Received);
        assert!(!session.state.is_terminal());
    }

    #[test]
    fn responded_and_aborted_are_terminal() {
        assert!(AskAiState::Responded.is_terminal());
        assert!(AskAiState::Aborted {
            reason: "x".into()
        }
        .is_terminal());
        assert!(!AskAiState::Clarifying.is_terminal());
    }

    #[test]
    fn clarification_round_is_bounded() {
        let now = Utc::now();
        let mut session = AskAiSession::new(SessionId::new(), "user-1", "q", now);
        for _ in 0..3 {
            session.begin_clarification_round(3, now).unwrap();
        }
        assert!(session.begin_clarification_round(3, now).is_err());
    }
}
