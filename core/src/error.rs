//! Error taxonomy for the analysis and Ask-AI pipelines.
//!
//! Mirrors the behavior-based classes of spec §7: transient external
//! failure, contract violation, persistence conflict, resource exhaustion,
//! and user-visible input error. `is_transient` drives the retry helper in
//! [`crate::retry`].

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mining patterns, synergies, and suggestions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Both the primary and fallback event-source read paths failed (§4.1).
    #[error("event source unavailable: {0}")]
    SourceUnavailable(String),

    /// A storage operation failed in a way that is not itself a conflict.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record from an external adapter was malformed (§7: skip, count, never retry).
    #[error("contract violation in {kind}: {detail}")]
    ContractViolation { kind: String, detail: String },

    /// An upsert hit a uniqueness or optimistic-concurrency clash that could
    /// not be resolved after the configured number of merge attempts.
    #[error("persistence conflict: {0}")]
    PersistenceConflict(String),

    /// A phase exceeded 3x its soft ceiling, or a memory guard tripped.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A transient failure from an outbound adapter call (network, timeout, 5xx).
    /// Eligible for the bounded retry of §5.
    #[error("transient adapter failure: {0}")]
    AdapterTransient(String),

    /// A non-transient failure from an outbound adapter call (4xx, validation).
    /// Surfaced immediately, never retried.
    #[error("adapter rejected request: {0}")]
    AdapterNonTransient(String),

    /// A caller-supplied value violated an invariant (e.g. empty entity id,
    /// `max_suggestions` out of `[5,50]`).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation was attempted in a state that forbids it (e.g. a second
    /// concurrent analysis run, a clarification after the session aborted).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a bounded retry with backoff is appropriate for this error
    /// (spec §5, §7). Non-transient errors must surface immediately instead.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::SourceUnavailable(_) | Error::AdapterTransient(_) | Error::ResourceExhausted(_)
        )
    }

    /// Whether this error represents a malformed upstream record that should
    /// be skipped and counted rather than failing the whole phase (§7).
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::ContractViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(Error::SourceUnavailable("x".into()).is_transient());
        assert!(Error::AdapterTransient("x".into()).is_transient());
        assert!(!Error::AdapterNonTransient("x".into()).is_transient());
        assert!(!Error::InvalidInput("x".into()).is_transient());
    }
}
