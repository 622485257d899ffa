//! Named-entity recognition over a raw Ask-AI query (§4.7 signal 1: exact
//! mention extraction feeds the resolver's exact-match and fuzzy signals).

use crate::Result;
use async_trait::async_trait;

/// A candidate device/area/domain mention extracted from free text, before
/// resolution against known entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMention {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[async_trait]
pub trait EntityExtractor: Send + Sync {
    /// # Errors
    /// Returns `Error::AdapterTransient` or `Error::AdapterNonTransient`.
    async fn extract(&self, query: &str) -> Result<Vec<EntityMention>>;
}
