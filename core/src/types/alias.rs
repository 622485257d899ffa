//! `AliasMap` (spec §3): user-registered shortcuts that pre-empt entity
//! resolver fusion (spec §4.7).

use super::ids::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasMap {
    pub user_id: String,
    pub alias: String,
    pub target_entity_id: EntityId,
    pub created_at: DateTime<Utc>,
}
