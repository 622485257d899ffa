//! `QueryMemory` (spec §3): the retrieval-cache row, indexed by C9.

use super::ids::{EntityId, QueryMemoryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMemory {
    pub id: QueryMemoryId,
    pub user_id: String,
    pub normalized_query: String,
    pub embedding: Vec<f32>,
    pub resolved_entities: Vec<EntityId>,
    /// Whether the user kept the result (spec §4.9: only `kept` queries are indexed).
    pub outcome_kept: bool,
    pub created_at: DateTime<Utc>,
}
