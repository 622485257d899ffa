//! Handing an approved `StructuredPlan` off to whatever deploys automations
//! (§4.6 `attach_artefact`, §4.8 executed Ask-AI plans). The analysis engine
//! never talks to a deployment target directly.

use crate::types::{StructuredPlan, SuggestionId};
use crate::Result;
use async_trait::async_trait;

/// Opaque identifier for a deployed artefact (e.g. a blueprint or automation
/// id), stored on the `Suggestion` once `attach_artefact` succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactHandle(pub String);

#[async_trait]
pub trait DeploymentPublisher: Send + Sync {
    /// # Errors
    /// Returns `Error::AdapterTransient` (retried per §5) or
    /// `Error::AdapterNonTransient` (surfaced immediately; the suggestion
    /// stays `Approved` rather than transitioning to `Deployed`).
    async fn deploy(&self, suggestion_id: SuggestionId, plan: &StructuredPlan) -> Result<ArtefactHandle>;
}
