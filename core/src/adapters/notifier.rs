//! Outbound notification of completed analysis runs and new suggestions
//! (§4.10: publish phase). Best-effort: a notification failure never fails
//! the run, it only gets logged (see `orchestrator::publish`).

use crate::types::RunId;
use crate::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct RunSummaryNotification {
    pub run_id: RunId,
    pub new_patterns: usize,
    pub new_synergies: usize,
    pub new_suggestions: usize,
}

#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// # Errors
    /// Returns `Error::AdapterTransient` or `Error::AdapterNonTransient`;
    /// callers treat both as non-fatal to the run (§4.10).
    async fn publish_run_summary(&self, notification: &RunSummaryNotification) -> Result<()>;
}
