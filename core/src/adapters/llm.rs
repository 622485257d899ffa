//! Natural-language description and structured-plan generation, used by the
//! composer (§4.6, description generation with a template fallback) and the
//! Ask-AI pipeline (§4.8, turning a resolved intent into a `StructuredPlan`).

use crate::config::CreativityLevel;
use crate::types::{DeviceCapability, EntityId, StructuredPlan};
use crate::Result;
use async_trait::async_trait;

/// What a suggestion is "about", handed to the adapter instead of a raw
/// prompt string so callers never have to know the adapter's prompt format.
#[derive(Debug, Clone)]
pub struct DescribeRequest {
    pub pattern_summary: String,
    pub synergy_summary: Option<String>,
    pub creativity: CreativityLevel,
}

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub intent: String,
    pub resolved_entities: Vec<EntityId>,
    pub capabilities: Vec<DeviceCapability>,
}

#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    /// Freeform description of a suggestion candidate.
    ///
    /// # Errors
    /// Returns `Error::AdapterTransient` or `Error::AdapterNonTransient`
    /// (spec §5 retry classification); callers fall back to a template on
    /// non-transient failure rather than dropping the suggestion.
    async fn describe(&self, request: &DescribeRequest) -> Result<String>;

    /// Turn a resolved Ask-AI intent into an executable plan.
    ///
    /// # Errors
    /// Same classification as [`Self::describe`].
    async fn plan(&self, request: &PlanRequest) -> Result<StructuredPlan>;
}
