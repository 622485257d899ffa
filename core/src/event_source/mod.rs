//! Event Source Adapter (C1, spec §4.1): read windowed event slices from the
//! time-series store, normalize to [`crate::types::Event`], fall back
//! between an HTTP primary path and a native-query fallback path. Grounded
//! on the teacher's `reqwest`-backed provider clients (e.g.
//! `embeddings/openai/client.rs`) for the HTTP half, and on
//! `storage::StorageBackend`'s `Send + Sync` async-trait shape for the
//! fallback half.

pub mod fallback;
pub mod http;
pub mod timeseries;

pub use fallback::FallbackEventSource;
pub use http::HttpEventSource;
pub use timeseries::TimeSeriesEventSource;

use crate::types::{Event, TimeWindow};
use crate::Result;
use async_trait::async_trait;

/// A single (attribute_name, value, timestamp) observation, used by C5's
/// feature-utilization calculator (spec §4.1 "attribute series").
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSample {
    pub entity_id: crate::types::EntityId,
    pub attribute: String,
    pub value: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Optional filter restricting `fetch_events` to a subset of entities.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub entity_ids: Option<Vec<crate::types::EntityId>>,
    pub domains: Option<Vec<String>>,
}

impl EntityFilter {
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ids) = &self.entity_ids {
            if !ids.contains(&event.entity_id) {
                return false;
            }
        }
        if let Some(domains) = &self.domains {
            if !domains.iter().any(|d| d == event.domain()) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Read a chronologically ordered event slice over `window`, optionally
    /// restricted by `filter`, capped at `limit` records.
    ///
    /// # Errors
    /// Returns `Error::SourceUnavailable` if both the primary and fallback
    /// read paths fail (spec §4.1).
    async fn fetch_events(
        &self,
        window: TimeWindow,
        filter: Option<&EntityFilter>,
        limit: usize,
    ) -> Result<Vec<Event>>;

    /// Attribute-value series for entities, used by C5 (spec §4.1, §4.5).
    /// Always served from the fallback store: the HTTP primary does not
    /// expose this read.
    async fn fetch_attribute_series(
        &self,
        window: TimeWindow,
        attribute: &str,
    ) -> Result<Vec<AttributeSample>>;

    /// Entities tagged with an external context variable (e.g. `rain`,
    /// `peak_tariff`, `media_playing`), used by C4's context synergies
    /// (spec §4.1, §4.4). Also fallback-only.
    async fn fetch_context_tagged_events(
        &self,
        window: TimeWindow,
        context_tag: &str,
    ) -> Result<Vec<Event>>;
}
