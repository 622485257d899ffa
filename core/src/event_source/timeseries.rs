//! Fallback read path: a direct time-range query against the underlying
//! time-series store using that store's native query language (spec §4.1).
//! The actual query language is not implied by this spec (§9); core stays
//! agnostic by depending on a narrow [`NativeQueryExecutor`] trait that a
//! concrete deployment wires up to its store's driver.

use super::{AttributeSample, EntityFilter, EventSource};
use crate::types::{Event, TimeWindow};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// The narrow native-query contract a time-series store driver must satisfy.
/// Kept separate from [`EventSource`] so `TimeSeriesEventSource` can add
/// filtering/normalization once, above whatever driver is plugged in.
#[async_trait]
pub trait NativeQueryExecutor: Send + Sync {
    async fn query_range(&self, window: TimeWindow, limit: usize) -> Result<Vec<Event>>;
    async fn query_attribute_series(
        &self,
        window: TimeWindow,
        attribute: &str,
    ) -> Result<Vec<AttributeSample>>;
    async fn query_context_tagged(&self, window: TimeWindow, context_tag: &str) -> Result<Vec<Event>>;
}

pub struct TimeSeriesEventSource {
    executor: Arc<dyn NativeQueryExecutor>,
}

impl TimeSeriesEventSource {
    #[must_use]
    pub fn new(executor: Arc<dyn NativeQueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl EventSource for TimeSeriesEventSource {
    async fn fetch_events(
        &self,
        window: TimeWindow,
        filter: Option<&EntityFilter>,
        limit: usize,
    ) -> Result<Vec<Event>> {
        let events = self
            .executor
            .query_range(window, limit)
            .await
            .map_err(|e| Error::SourceUnavailable(format!("native query failed: {e}")))?;

        Ok(events
            .into_iter()
            .filter(|e| filter.map_or(true, |f| f.matches(e)))
            .collect())
    }

    async fn fetch_attribute_series(
        &self,
        window: TimeWindow,
        attribute: &str,
    ) -> Result<Vec<AttributeSample>> {
        self.executor
            .query_attribute_series(window, attribute)
            .await
            .map_err(|e| Error::SourceUnavailable(format!("native attribute query failed: {e}")))
    }

    async fn fetch_context_tagged_events(
        &self,
        window: TimeWindow,
        context_tag: &str,
    ) -> Result<Vec<Event>> {
        self.executor
            .query_context_tagged(window, context_tag)
            .await
            .map_err(|e| Error::SourceUnavailable(format!("native context query failed: {e}")))
    }
}
