//! Query filters for the list operations on [`super::StorageBackend`].
//! Plain builder-style structs, mirroring the teacher's
//! `memory-core/src/storage/query.rs` filter shape.

use crate::types::{EntityId, PatternKind, SynergyKind};

#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    pub kind: Option<PatternKind>,
    pub anchor: Option<EntityId>,
    pub min_confidence: Option<f64>,
}

impl PatternFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_kind(mut self, kind: PatternKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: EntityId) -> Self {
        self.anchor = Some(anchor);
        self
    }

    #[must_use]
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Whether `pattern` satisfies this filter; in-memory backends can use
    /// this instead of duplicating the predicate against SQL `WHERE` clauses.
    #[must_use]
    pub fn matches(&self, pattern: &crate::types::Pattern) -> bool {
        if let Some(kind) = self.kind {
            if pattern.kind() != kind {
                return false;
            }
        }
        if let Some(min_confidence) = self.min_confidence {
            if pattern.confidence() < min_confidence {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct SynergyFilter {
    pub kind: Option<SynergyKind>,
    pub min_priority: Option<f64>,
    pub involving: Option<EntityId>,
}

impl SynergyFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_kind(mut self, kind: SynergyKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn with_min_priority(mut self, min_priority: f64) -> Self {
        self.min_priority = Some(min_priority);
        self
    }

    #[must_use]
    pub fn involving(mut self, entity: EntityId) -> Self {
        self.involving = Some(entity);
        self
    }

    /// Whether `synergy` satisfies this filter; in-memory backends can use
    /// this instead of duplicating the predicate against SQL `WHERE` clauses.
    #[must_use]
    pub fn matches(&self, synergy: &crate::types::Synergy) -> bool {
        if let Some(kind) = self.kind {
            if synergy.kind != kind {
                return false;
            }
        }
        if let Some(min_priority) = self.min_priority {
            if synergy.priority(&crate::types::PriorityWeights::default()) < min_priority {
                return false;
            }
        }
        if let Some(entity) = &self.involving {
            if !synergy.chain.contains(entity) {
                return false;
            }
        }
        true
    }
}
